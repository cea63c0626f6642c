//! Palette module - pending pieces offered to the player
//!
//! Three slots each hold zero or one (template, variant) pair. Consuming a
//! slot empties it; when every slot is empty the palette refills all of them
//! atomically with fresh random draws. Variants are skin selectors only.

use crate::core::rng::SimpleRng;
use crate::core::shape::{self, ShapeId};
use crate::types::{SLOT_COUNT, VARIANT_COUNT};

/// A pending placeable piece: a catalog template plus a skin variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingPiece {
    pub shape: ShapeId,
    pub variant: u8,
}

/// The slot set holding pending placeable shapes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    slots: [Option<PendingPiece>; SLOT_COUNT],
}

impl Palette {
    /// Create a palette with all slots empty
    pub fn new() -> Self {
        Self {
            slots: [None; SLOT_COUNT],
        }
    }

    /// Assign fresh random pieces to every slot
    pub fn refill(&mut self, rng: &mut SimpleRng) {
        for slot in &mut self.slots {
            *slot = Some(PendingPiece {
                shape: rng.next_range(shape::catalog().len() as u32) as ShapeId,
                variant: rng.next_range(VARIANT_COUNT as u32) as u8,
            });
        }
    }

    /// Peek at a slot without consuming it; None for empty or invalid slots
    pub fn peek(&self, slot: usize) -> Option<PendingPiece> {
        self.slots.get(slot).copied().flatten()
    }

    /// Consume a slot, leaving it empty
    pub fn take(&mut self, slot: usize) -> Option<PendingPiece> {
        self.slots.get_mut(slot).and_then(|s| s.take())
    }

    /// True when every slot is empty
    pub fn is_exhausted(&self) -> bool {
        self.slots.iter().all(|slot| slot.is_none())
    }

    /// Refill all slots if the palette is exhausted; true when a refill ran
    pub fn refill_if_exhausted(&mut self, rng: &mut SimpleRng) -> bool {
        if self.is_exhausted() {
            self.refill(rng);
            return true;
        }
        false
    }

    /// Read-only view of the slots (for render and persistence)
    pub fn slots(&self) -> &[Option<PendingPiece>; SLOT_COUNT] {
        &self.slots
    }

    /// Iterate non-empty slots as (slot index, piece)
    pub fn pending(&self) -> impl Iterator<Item = (usize, PendingPiece)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.map(|p| (i, p)))
    }

    /// Restore slot contents verbatim; false if a saved shape id is not in
    /// the catalog or the slot count does not match
    pub fn restore(&mut self, saved: &[Option<PendingPiece>]) -> bool {
        if saved.len() != SLOT_COUNT {
            return false;
        }
        for piece in saved.iter().flatten() {
            if shape::get(piece.shape).is_none() {
                return false;
            }
        }
        for (slot, value) in self.slots.iter_mut().zip(saved) {
            *slot = *value;
        }
        true
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::new()
    }
}
