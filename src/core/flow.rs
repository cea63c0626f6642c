//! Flow module - the orchestration state machine around the rules core
//!
//! Owns the board, palette, score engine and RNG, and sequences
//! Boot -> Playing <-> Paused -> {GameOver | BestScore | Revive -> Playing}.
//! Long-running effects (the end-wave settle, the revive countdown) are
//! expressed as `tick(elapsed_ms)` steps against the caller's pausable
//! clock, never as blocking waits. Exactly one end-flow sequence can be
//! active at a time; duplicate no-move signals are coalesced into no-ops.

use crate::core::board::{Board, BoardConfig, ClearedLines};
use crate::core::palette::Palette;
use crate::core::rng::SimpleRng;
use crate::core::scoring::{PlacementScore, ScoreEngine, ScorePolicy};
use crate::core::shape;
use crate::core::snapshot::SaveSnapshot;
use crate::types::{
    FlowEvent, GamePhase, END_WAVE_EXTRA_WAIT_MS, END_WAVE_ROW_STEP_MS, REVIVE_COUNTDOWN_MS,
};

/// Timing policy for the flow's timed sub-sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowConfig {
    /// How long a revive offer stays open before routing to game over
    pub revive_countdown_ms: u32,
    /// Per-row step of the end-wave settle
    pub end_wave_row_step_ms: u32,
    /// Fixed tail wait after the last row settles
    pub end_wave_extra_wait_ms: u32,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            revive_countdown_ms: REVIVE_COUNTDOWN_MS,
            end_wave_row_step_ms: END_WAVE_ROW_STEP_MS,
            end_wave_extra_wait_ms: END_WAVE_EXTRA_WAIT_MS,
        }
    }
}

/// Everything needed to construct a game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameConfig {
    pub board: BoardConfig,
    pub flow: FlowConfig,
    pub score: ScorePolicy,
    pub rng_seed: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            board: BoardConfig::default(),
            flow: FlowConfig::default(),
            score: ScorePolicy::default(),
            rng_seed: 1,
        }
    }
}

/// Terminal branch chosen when no legal move remains
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndBranch {
    GameOver,
    BestScore,
    Revive,
}

/// In-progress end-wave settle
#[derive(Debug, Clone, Copy)]
struct EndWave {
    branch: EndBranch,
    elapsed_ms: u32,
    duration_ms: u32,
}

/// Outcome of one settled placement, for the caller's display layer
#[derive(Debug, Clone)]
pub struct PlacementReport {
    pub slot: usize,
    pub cells_placed: u32,
    pub cleared: ClearedLines,
    pub score: PlacementScore,
    /// Non-zero when the placement emptied the board
    pub board_clear_bonus: u32,
}

impl PlacementReport {
    pub fn lines_cleared(&self) -> u32 {
        self.cleared.total()
    }
}

/// The game-flow state machine
#[derive(Debug, Clone)]
pub struct GameFlow {
    config: FlowConfig,
    board_config: BoardConfig,
    board: Board,
    palette: Palette,
    score: ScoreEngine,
    rng: SimpleRng,
    phase: GamePhase,
    /// High score recorded when the run started; baseline for the
    /// best-score and revive branches.
    high_at_run_start: u32,
    revive_used: bool,
    best_notified: bool,
    intro_shown: bool,
    end_wave: Option<EndWave>,
    revive_remaining_ms: Option<u32>,
    events: Vec<FlowEvent>,
}

impl GameFlow {
    /// Create a controller in the Boot phase
    pub fn new(config: GameConfig) -> Self {
        Self {
            config: config.flow,
            board_config: config.board,
            board: Board::new(&config.board),
            palette: Palette::new(),
            score: ScoreEngine::new(config.score),
            rng: SimpleRng::new(config.rng_seed),
            phase: GamePhase::Boot,
            high_at_run_start: 0,
            revive_used: false,
            best_notified: false,
            intro_shown: false,
            end_wave: None,
            revive_remaining_ms: None,
            events: Vec::new(),
        }
    }

    pub fn phase(&self) -> GamePhase {
        self.phase
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn score(&self) -> &ScoreEngine {
        &self.score
    }

    pub fn revive_used(&self) -> bool {
        self.revive_used
    }

    pub fn high_score_at_run_start(&self) -> u32 {
        self.high_at_run_start
    }

    /// True while an end-wave settle or a revive offer is pending
    pub fn end_flow_running(&self) -> bool {
        self.end_wave.is_some() || self.revive_remaining_ms.is_some()
    }

    /// Remaining revive countdown, when an offer is pending
    pub fn revive_remaining_ms(&self) -> Option<u32> {
        self.revive_remaining_ms
    }

    /// Placements are accepted only in this state
    pub fn playable(&self) -> bool {
        self.phase == GamePhase::Playing && !self.end_flow_running()
    }

    /// Deterministic end-wave duration: rows * per-row step + fixed tail
    pub fn end_wave_duration_ms(&self) -> u32 {
        self.board.rows() as u32 * self.config.end_wave_row_step_ms
            + self.config.end_wave_extra_wait_ms
    }

    /// Drain pending notifications. Fire-and-forget: the engine is correct
    /// if this is never called.
    pub fn drain_events(&mut self) -> Vec<FlowEvent> {
        std::mem::take(&mut self.events)
    }

    fn set_phase(&mut self, phase: GamePhase) {
        if self.phase == phase {
            return;
        }
        self.phase = phase;
        self.events.push(FlowEvent::PhaseChanged(phase));
        log::info!("phase -> {}", phase.as_str());
    }

    /// Explicit start action: reset score run, reseed or clear the board,
    /// refill the palette and enter Playing.
    pub fn start_new_game(&mut self) {
        self.end_wave = None;
        self.revive_remaining_ms = None;
        self.revive_used = false;
        self.best_notified = false;
        self.score.reset_run();

        if self.board_config.seed_at_start {
            let (min, max) = (
                self.board_config.initial_min_occupied,
                self.board_config.initial_max_occupied,
            );
            self.board.seed_random(&mut self.rng, min, max);
        } else {
            self.board.reset();
        }
        self.palette.refill(&mut self.rng);

        self.high_at_run_start = self.score.high_score();
        self.set_phase(GamePhase::Playing);
        self.events.push(FlowEvent::GameStarted);
        log::info!(
            "game started (high score at run start: {})",
            self.high_at_run_start
        );
    }

    /// Suspend play. No board or score mutation; ticks make no progress
    /// until resumed. Rejected while a revive decision is pending.
    pub fn pause(&mut self) -> bool {
        if self.phase != GamePhase::Playing || self.revive_remaining_ms.is_some() {
            return false;
        }
        self.set_phase(GamePhase::Paused);
        true
    }

    /// Resume suspended play
    pub fn resume(&mut self) -> bool {
        if self.phase != GamePhase::Paused {
            return false;
        }
        self.set_phase(GamePhase::Playing);
        true
    }

    /// Legality probe for the UI's drag feedback; never mutates
    pub fn can_place_from_slot(&self, slot: usize, anchor_row: i8, anchor_col: i8) -> bool {
        if !self.playable() {
            return false;
        }
        let Some(pending) = self.palette.peek(slot) else {
            return false;
        };
        let Some(template) = shape::get(pending.shape) else {
            return false;
        };
        self.board.can_place(template, anchor_row, anchor_col)
    }

    /// Settle one placement: consume the slot, mark the board, clear full
    /// lines, account the score, refill an exhausted palette and run
    /// no-move detection.
    ///
    /// Returns None without touching any state when the game is not
    /// playable, the slot is empty, or the placement is illegal.
    pub fn try_place(
        &mut self,
        slot: usize,
        anchor_row: i8,
        anchor_col: i8,
    ) -> Option<PlacementReport> {
        if !self.playable() {
            return None;
        }
        let pending = self.palette.peek(slot)?;
        let template = shape::get(pending.shape)?;
        if !self.board.can_place(template, anchor_row, anchor_col) {
            return None;
        }

        self.palette.take(slot);
        self.board
            .place(template, anchor_row, anchor_col, pending.variant);
        let cleared = self
            .board
            .resolve_and_clear_full_lines(template, anchor_row, anchor_col);

        let cells_placed = template.cell_count() as u32;
        let lines_cleared = cleared.total();
        let score = self.score.on_piece_placed(cells_placed, lines_cleared);

        self.events.push(FlowEvent::PiecePlaced {
            cells: cells_placed,
            lines_cleared,
        });
        if lines_cleared > 0 {
            self.events.push(FlowEvent::LinesCleared {
                rows: cleared.rows.len() as u32,
                cols: cleared.cols.len() as u32,
            });
        }

        let board_clear_bonus = if lines_cleared > 0 && self.board.is_completely_empty() {
            let bonus = self.score.award_board_clear_bonus();
            self.events.push(FlowEvent::BoardCleared { bonus });
            bonus
        } else {
            0
        };

        if !self.best_notified
            && self.high_at_run_start > 0
            && self.score.total() > self.high_at_run_start
        {
            self.best_notified = true;
            self.events.push(FlowEvent::NewHighScore {
                high_score: self.score.high_score(),
            });
        }

        self.palette.refill_if_exhausted(&mut self.rng);

        if !self.any_legal_move() {
            self.begin_end_flow();
        }

        Some(PlacementReport {
            slot,
            cells_placed,
            cleared,
            score,
            board_clear_bonus,
        })
    }

    /// True if any pending palette shape has a legal placement somewhere
    fn any_legal_move(&self) -> bool {
        self.palette.pending().any(|(_, piece)| {
            shape::get(piece.shape)
                .map(|template| self.board.can_place_anywhere(template))
                .unwrap_or(false)
        })
    }

    /// Start the end-wave settle toward the branch chosen by priority:
    /// best score, then a one-per-run revive offer, then game over.
    /// A no-op while an end flow is already running.
    fn begin_end_flow(&mut self) {
        if self.end_flow_running() {
            return;
        }
        let total = self.score.total();
        let branch = if total > self.high_at_run_start {
            EndBranch::BestScore
        } else if !self.revive_used && total.saturating_mul(2) > self.high_at_run_start {
            EndBranch::Revive
        } else {
            EndBranch::GameOver
        };
        let duration_ms = self.end_wave_duration_ms();
        log::info!(
            "no legal move remains: {:?} after {} ms settle",
            branch,
            duration_ms
        );
        self.end_wave = Some(EndWave {
            branch,
            elapsed_ms: 0,
            duration_ms,
        });
    }

    /// Advance timed sub-sequences by `elapsed_ms` of the external pausable
    /// clock. Freezes entirely while Paused.
    pub fn tick(&mut self, elapsed_ms: u32) {
        if self.phase == GamePhase::Paused {
            return;
        }

        if let Some(remaining) = self.revive_remaining_ms {
            let remaining = remaining.saturating_sub(elapsed_ms);
            if remaining == 0 {
                self.revive_remaining_ms = None;
                self.events.push(FlowEvent::ReviveExpired);
                log::info!("revive offer expired");
                self.go_game_over();
            } else {
                self.revive_remaining_ms = Some(remaining);
            }
            return;
        }

        let mut finished = None;
        if let Some(wave) = &mut self.end_wave {
            wave.elapsed_ms = wave.elapsed_ms.saturating_add(elapsed_ms);
            let step = self.config.end_wave_row_step_ms;
            let settled_rows = if step == 0 {
                self.board.rows()
            } else {
                (wave.elapsed_ms / step).min(self.board.rows() as u32) as u8
            };
            self.board.fill_ghost_rows(settled_rows);
            if wave.elapsed_ms >= wave.duration_ms {
                finished = Some(wave.branch);
            }
        }

        if let Some(branch) = finished {
            self.end_wave = None;
            self.board.fill_ghost_rows(self.board.rows());
            match branch {
                EndBranch::GameOver => self.go_game_over(),
                EndBranch::BestScore => self.go_best_score(),
                EndBranch::Revive => {
                    let countdown_ms = self.config.revive_countdown_ms;
                    self.revive_remaining_ms = Some(countdown_ms);
                    self.events.push(FlowEvent::ReviveOffered { countdown_ms });
                    log::info!("revive offered ({} ms)", countdown_ms);
                }
            }
        }
    }

    /// Accept a pending revive offer: clear the settle overlay, refill the
    /// palette, mark the revive spent and resume play.
    pub fn accept_revive(&mut self) -> bool {
        if self.revive_remaining_ms.is_none() {
            return false;
        }
        self.revive_remaining_ms = None;
        self.revive_used = true;
        self.board.clear_ghosts();
        self.palette.refill(&mut self.rng);
        self.events.push(FlowEvent::ReviveAccepted);
        log::info!("revive accepted");

        // The fresh palette may still have no legal move; re-run detection
        // so the run cannot strand (revive is spent, so this routes onward).
        if !self.any_legal_move() {
            self.begin_end_flow();
        }
        true
    }

    /// Decline a pending revive offer, routing to game over
    pub fn decline_revive(&mut self) -> bool {
        if self.revive_remaining_ms.is_none() {
            return false;
        }
        self.revive_remaining_ms = None;
        self.go_game_over();
        true
    }

    fn go_game_over(&mut self) {
        self.set_phase(GamePhase::GameOver);
    }

    fn go_best_score(&mut self) {
        self.set_phase(GamePhase::BestScore);
    }

    /// Capture a resume snapshot; None when there is nothing worth saving
    /// (captured score of zero means the persisted state should be cleared)
    pub fn capture(&self) -> Option<SaveSnapshot> {
        if self.score.total() == 0 {
            return None;
        }
        Some(SaveSnapshot::capture(
            &self.board,
            &self.palette,
            &self.score,
            self.revive_used,
        ))
    }

    /// Restore a run from a snapshot and enter Playing directly, skipping
    /// the start-of-game reseed. Malformed or empty snapshots degrade to a
    /// fresh game; returns whether the snapshot was actually restored.
    pub fn continue_from_save(&mut self, snapshot: &SaveSnapshot) -> bool {
        if snapshot.score_total == 0
            || !snapshot.is_valid_for(self.board.rows(), self.board.cols())
        {
            log::warn!("unusable snapshot; starting a fresh game");
            self.start_new_game();
            return false;
        }
        if !self.board.load_cells(&snapshot.cells)
            || !self.palette.restore(&snapshot.palette_pieces())
        {
            log::warn!("snapshot restore failed; starting a fresh game");
            self.start_new_game();
            return false;
        }

        self.score.restore_high_score(snapshot.high_score);
        self.score.restore(snapshot.score_total, snapshot.combo);
        self.revive_used = snapshot.revive_used;
        self.best_notified = false;
        self.end_wave = None;
        self.revive_remaining_ms = None;
        self.high_at_run_start = self.score.high_score();

        self.set_phase(GamePhase::Playing);
        self.events.push(FlowEvent::GameStarted);
        log::info!("resumed from snapshot (score {})", snapshot.score_total);
        true
    }

    /// Application-foregrounded hook: re-emits the one-shot startup effect
    /// on the first call only. Tolerates zero or many calls.
    pub fn on_app_foreground(&mut self) {
        if !self.intro_shown {
            self.intro_shown = true;
            self.events.push(FlowEvent::IntroEffect);
        }
    }

    #[cfg(test)]
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    #[cfg(test)]
    pub(crate) fn palette_mut(&mut self) -> &mut Palette {
        &mut self.palette
    }

    #[cfg(test)]
    pub(crate) fn score_mut(&mut self) -> &mut ScoreEngine {
        &mut self.score
    }
}

impl Default for GameFlow {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
