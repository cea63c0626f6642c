//! Save module - single-slot JSON persistence for resume-after-kill
//!
//! The store owns one file. Saving overwrites it, loading tolerates a
//! missing or corrupt file by reporting absence, and clearing removes it.
//! Corrupt persisted state is never fatal: it degrades to "start fresh".

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::core::flow::GameFlow;
use crate::core::snapshot::SaveSnapshot;

/// Environment variable overriding the save file location
pub const SAVE_PATH_ENV: &str = "BLOCKGRID_SAVE_PATH";

/// Default save file name (relative to the working directory)
pub const DEFAULT_SAVE_FILE: &str = "blockgrid_save.json";

/// File-backed store for the resume snapshot
#[derive(Debug, Clone)]
pub struct SaveStore {
    path: PathBuf,
}

impl SaveStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at `BLOCKGRID_SAVE_PATH`, or the default file name
    pub fn from_env() -> Self {
        let path = std::env::var(SAVE_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SAVE_FILE));
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the persisted snapshot
    pub fn save(&self, snapshot: &SaveSnapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot).context("serialize snapshot")?;
        fs::write(&self.path, json)
            .with_context(|| format!("write snapshot to {}", self.path.display()))?;
        Ok(())
    }

    /// Load the persisted snapshot. Missing, unreadable or unparsable state
    /// is reported as absence, never as an error.
    pub fn try_load(&self) -> Option<SaveSnapshot> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(err) if err.kind() == ErrorKind::NotFound => return None,
            Err(err) => {
                log::warn!("unreadable save file {}: {}", self.path.display(), err);
                return None;
            }
        };
        match serde_json::from_str::<SaveSnapshot>(&json) {
            Ok(snapshot) => Some(snapshot),
            Err(err) => {
                log::warn!("corrupt save file {}: {}", self.path.display(), err);
                None
            }
        }
    }

    /// Remove the persisted snapshot, if any
    pub fn clear(&self) {
        if let Err(err) = fs::remove_file(&self.path) {
            if err.kind() != ErrorKind::NotFound {
                log::warn!("failed to clear save file {}: {}", self.path.display(), err);
            }
        }
    }

    /// Persist the flow's current run, or clear the store when there is
    /// nothing worth keeping (captured score of zero). Called on app
    /// suspension/quit and after settled placements.
    pub fn save_or_clear(&self, flow: &GameFlow) -> Result<()> {
        match flow.capture() {
            Some(snapshot) => self.save(&snapshot),
            None => {
                self.clear();
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::flow::GameConfig;
    use std::sync::atomic::{AtomicU32, Ordering};

    static NEXT_FILE: AtomicU32 = AtomicU32::new(0);

    fn temp_store() -> SaveStore {
        let n = NEXT_FILE.fetch_add(1, Ordering::Relaxed);
        let path = std::env::temp_dir().join(format!(
            "blockgrid_save_test_{}_{}.json",
            std::process::id(),
            n
        ));
        SaveStore::new(path)
    }

    fn snapshot_with_score(total: u32) -> SaveSnapshot {
        let mut flow = GameFlow::new(GameConfig::default());
        flow.start_new_game();
        let mut snapshot = SaveSnapshot::capture(
            flow.board(),
            flow.palette(),
            flow.score(),
            false,
        );
        snapshot.score_total = total;
        snapshot
    }

    #[test]
    fn test_save_load_roundtrip() {
        let store = temp_store();
        let snapshot = snapshot_with_score(150);

        store.save(&snapshot).expect("save");
        let loaded = store.try_load().expect("load");
        assert_eq!(loaded, snapshot);

        store.clear();
        assert!(store.try_load().is_none());
    }

    #[test]
    fn test_try_load_missing_file() {
        let store = temp_store();
        assert!(store.try_load().is_none());
        // Clearing a missing file is a quiet no-op
        store.clear();
    }

    #[test]
    fn test_try_load_corrupt_file() {
        let store = temp_store();
        fs::write(store.path(), "{not json").expect("write garbage");
        assert!(store.try_load().is_none());
        store.clear();
    }

    #[test]
    fn test_save_overwrites_previous() {
        let store = temp_store();
        store.save(&snapshot_with_score(10)).expect("save");
        store.save(&snapshot_with_score(20)).expect("save");
        assert_eq!(store.try_load().expect("load").score_total, 20);
        store.clear();
    }

    #[test]
    fn test_save_or_clear_skips_zero_score() {
        let store = temp_store();
        // Leave stale state behind, then ask a zero-score flow to persist
        store.save(&snapshot_with_score(99)).expect("save");

        let mut flow = GameFlow::new(GameConfig::default());
        flow.start_new_game();
        assert_eq!(flow.score().total(), 0);
        store.save_or_clear(&flow).expect("save_or_clear");
        assert!(store.try_load().is_none());
    }

    #[test]
    fn test_save_or_clear_persists_nonzero_score() {
        let store = temp_store();
        let mut flow = GameFlow::new(GameConfig::default());
        flow.start_new_game();

        // Place the first pending piece wherever it fits
        let (slot, _) = flow.palette().pending().next().expect("pending piece");
        let mut placed = false;
        'outer: for row in 0..8 {
            for col in 0..8 {
                if flow.try_place(slot, row, col).is_some() {
                    placed = true;
                    break 'outer;
                }
            }
        }
        assert!(placed);
        assert!(flow.score().total() > 0);

        store.save_or_clear(&flow).expect("save_or_clear");
        let loaded = store.try_load().expect("load");
        assert_eq!(loaded.score_total, flow.score().total());
        store.clear();
    }
}
