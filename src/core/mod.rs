//! Core module - pure game rules with no I/O
//!
//! This module contains the board, shapes, palette, scoring and the flow
//! state machine. It has zero dependencies on rendering, input or storage;
//! persistence does the file work in `crate::save` against the snapshot
//! types defined here.

pub mod board;
pub mod flow;
pub mod palette;
pub mod rng;
pub mod scoring;
pub mod shape;
pub mod snapshot;

// Re-export commonly used types
pub use board::{Board, BoardConfig, ClearedLines};
pub use flow::{FlowConfig, GameConfig, GameFlow, PlacementReport};
pub use palette::{Palette, PendingPiece};
pub use rng::SimpleRng;
pub use scoring::{PlacementScore, ScoreEngine, ScorePolicy};
pub use shape::{catalog, ShapeId, ShapeTemplate};
pub use snapshot::{SaveSnapshot, SlotSave, SNAPSHOT_VERSION};
