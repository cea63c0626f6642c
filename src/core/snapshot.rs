//! Snapshot module - the persisted resume capture
//!
//! A flat, versioned record of board occupancy+variants, palette slots,
//! score fields and the revive-used flag. Single-slot save: each capture
//! overwrites the previous one. Transient flow state (end-wave progress,
//! pending revive offer) is deliberately absent.

use serde::{Deserialize, Serialize};

use crate::core::board::Board;
use crate::core::palette::{Palette, PendingPiece};
use crate::core::scoring::ScoreEngine;
use crate::types::SLOT_COUNT;

/// Bump when the snapshot layout changes; readers reject other versions.
pub const SNAPSHOT_VERSION: u32 = 1;

/// Persisted form of one palette slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSave {
    pub shape: u8,
    pub variant: u8,
}

impl From<PendingPiece> for SlotSave {
    fn from(value: PendingPiece) -> Self {
        Self {
            shape: value.shape,
            variant: value.variant,
        }
    }
}

impl From<SlotSave> for PendingPiece {
    fn from(value: SlotSave) -> Self {
        Self {
            shape: value.shape,
            variant: value.variant,
        }
    }
}

/// Serializable capture of a run, sufficient to resume after a process kill
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveSnapshot {
    pub version: u32,
    pub rows: u8,
    pub cols: u8,
    /// Row-major cells: 0 = empty, otherwise variant + 1
    pub cells: Vec<u8>,
    pub palette: Vec<Option<SlotSave>>,
    pub score_total: u32,
    pub high_score: u32,
    pub combo: u32,
    pub revive_used: bool,
}

impl SaveSnapshot {
    /// Capture the current run state
    pub fn capture(
        board: &Board,
        palette: &Palette,
        score: &ScoreEngine,
        revive_used: bool,
    ) -> Self {
        let mut cells = Vec::new();
        board.write_cells(&mut cells);
        Self {
            version: SNAPSHOT_VERSION,
            rows: board.rows(),
            cols: board.cols(),
            cells,
            palette: palette
                .slots()
                .iter()
                .map(|slot| slot.map(SlotSave::from))
                .collect(),
            score_total: score.total(),
            high_score: score.high_score(),
            combo: score.combo(),
            revive_used,
        }
    }

    /// Structural validity against a target board geometry.
    /// A failing snapshot is treated as absent, never as an error.
    pub fn is_valid_for(&self, rows: u8, cols: u8) -> bool {
        self.version == SNAPSHOT_VERSION
            && self.rows == rows
            && self.cols == cols
            && self.cells.len() == rows as usize * cols as usize
            && self.palette.len() == SLOT_COUNT
    }

    /// Palette contents in restore form
    pub fn palette_pieces(&self) -> Vec<Option<PendingPiece>> {
        self.palette
            .iter()
            .map(|slot| slot.map(PendingPiece::from))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::BoardConfig;
    use crate::core::rng::SimpleRng;
    use crate::core::shape::ShapeTemplate;

    fn sample_state() -> (Board, Palette, ScoreEngine) {
        let mut board = Board::new(&BoardConfig::default());
        let bar: &[(i8, i8)] = &[(0, 0), (0, 1), (0, 2)];
        board.place(&ShapeTemplate::new(bar), 2, 1, 3);

        let mut rng = SimpleRng::new(77);
        let mut palette = Palette::new();
        palette.refill(&mut rng);
        palette.take(1);

        let mut score = ScoreEngine::default();
        score.restore(150, 2);
        (board, palette, score)
    }

    #[test]
    fn test_capture_records_all_fields() {
        let (board, palette, score) = sample_state();
        let snap = SaveSnapshot::capture(&board, &palette, &score, true);

        assert_eq!(snap.version, SNAPSHOT_VERSION);
        assert_eq!((snap.rows, snap.cols), (8, 8));
        assert_eq!(snap.cells.len(), 64);
        assert_eq!(snap.cells[2 * 8 + 1], 4);
        assert_eq!(snap.palette.len(), SLOT_COUNT);
        assert!(snap.palette[0].is_some());
        assert!(snap.palette[1].is_none());
        assert_eq!(snap.score_total, 150);
        assert_eq!(snap.high_score, 150);
        assert_eq!(snap.combo, 2);
        assert!(snap.revive_used);
    }

    #[test]
    fn test_json_roundtrip() {
        let (board, palette, score) = sample_state();
        let snap = SaveSnapshot::capture(&board, &palette, &score, false);

        let json = serde_json::to_string(&snap).expect("serialize");
        let back: SaveSnapshot = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, snap);
    }

    #[test]
    fn test_validity_checks() {
        let (board, palette, score) = sample_state();
        let snap = SaveSnapshot::capture(&board, &palette, &score, false);
        assert!(snap.is_valid_for(8, 8));
        assert!(!snap.is_valid_for(8, 10));

        let mut wrong_version = snap.clone();
        wrong_version.version = SNAPSHOT_VERSION + 1;
        assert!(!wrong_version.is_valid_for(8, 8));

        let mut truncated = snap.clone();
        truncated.cells.pop();
        assert!(!truncated.is_valid_for(8, 8));

        let mut short_palette = snap;
        short_palette.palette.pop();
        assert!(!short_palette.is_valid_for(8, 8));
    }
}
