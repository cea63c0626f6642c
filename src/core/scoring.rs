//! Scoring module - combo and points bookkeeping
//!
//! Points come from three sources: a per-cell award on every placement, a
//! line award that scales with both the number of lines cleared at once and
//! the current combo depth, and a flat bonus for emptying the whole board.
//! The exact curve is policy, not contract; the invariants that matter are
//! monotonicity in both inputs, combo reset on zero-clear placements, and a
//! high score that never decreases.

use crate::types::{BOARD_CLEAR_BONUS, LINE_BASE_POINTS, POINTS_PER_CELL};

/// Tunable point values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScorePolicy {
    /// Base points per placed cell, awarded regardless of clears
    pub points_per_cell: u32,
    /// Scale factor of the line-clear award
    pub line_base: u32,
    /// Flat bonus for clearing the last occupied cell off the board
    pub board_clear_bonus: u32,
}

impl Default for ScorePolicy {
    fn default() -> Self {
        Self {
            points_per_cell: POINTS_PER_CELL,
            line_base: LINE_BASE_POINTS,
            board_clear_bonus: BOARD_CLEAR_BONUS,
        }
    }
}

/// Triangular number; makes simultaneous clears superlinear
fn tri(n: u32) -> u32 {
    n * (n + 1) / 2
}

/// Line award for a clearing placement.
/// Monotonic non-decreasing in both `lines` and `combo_before`.
pub fn line_points(policy: &ScorePolicy, lines: u32, combo_before: u32) -> u32 {
    if lines == 0 {
        return 0;
    }
    policy
        .line_base
        .saturating_mul(tri(lines))
        .saturating_mul(combo_before + 1)
}

/// Breakdown of the points awarded for one settled placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlacementScore {
    /// Award for the placed cells themselves
    pub cell_points: u32,
    /// Combo depth read before this placement changed it
    pub combo_before: u32,
    /// Line award (zero when nothing cleared)
    pub line_points: u32,
    /// Running total after this placement
    pub total_after: u32,
}

/// Score and combo state for the current run, plus the persisted high score.
/// Never touches the board; side effects are confined to these counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreEngine {
    policy: ScorePolicy,
    total: u32,
    high_score: u32,
    combo: u32,
}

impl ScoreEngine {
    pub fn new(policy: ScorePolicy) -> Self {
        Self {
            policy,
            total: 0,
            high_score: 0,
            combo: 0,
        }
    }

    pub fn total(&self) -> u32 {
        self.total
    }

    pub fn high_score(&self) -> u32 {
        self.high_score
    }

    /// Consecutive placements that each cleared at least one line
    pub fn combo(&self) -> u32 {
        self.combo
    }

    pub fn policy(&self) -> &ScorePolicy {
        &self.policy
    }

    /// Account one settled placement.
    ///
    /// Zero cleared lines resets the combo; one or more cleared lines award
    /// line points computed against the combo depth before the increment.
    pub fn on_piece_placed(&mut self, filled_cells: u32, lines_cleared: u32) -> PlacementScore {
        let cell_points = filled_cells.saturating_mul(self.policy.points_per_cell);
        self.total = self.total.saturating_add(cell_points);

        let combo_before = self.combo;
        let line_award = if lines_cleared == 0 {
            self.combo = 0;
            0
        } else {
            let award = line_points(&self.policy, lines_cleared, combo_before);
            self.total = self.total.saturating_add(award);
            self.combo += 1;
            award
        };

        self.high_score = self.high_score.max(self.total);
        PlacementScore {
            cell_points,
            combo_before,
            line_points: line_award,
            total_after: self.total,
        }
    }

    /// Flat bonus for a placement that left the board completely empty.
    /// Independent of the per-line formula; returns the amount awarded.
    pub fn award_board_clear_bonus(&mut self) -> u32 {
        self.total = self.total.saturating_add(self.policy.board_clear_bonus);
        self.high_score = self.high_score.max(self.total);
        self.policy.board_clear_bonus
    }

    /// Zero the run counters, keeping the high score
    pub fn reset_run(&mut self) {
        self.total = 0;
        self.combo = 0;
    }

    /// Restore run counters from a snapshot
    pub fn restore(&mut self, total: u32, combo: u32) {
        self.total = total;
        self.combo = combo;
        self.high_score = self.high_score.max(total);
    }

    /// Restore the persisted high score (resume-from-save)
    pub fn restore_high_score(&mut self, high_score: u32) {
        self.high_score = self.high_score.max(high_score);
    }
}

impl Default for ScoreEngine {
    fn default() -> Self {
        Self::new(ScorePolicy::default())
    }
}
