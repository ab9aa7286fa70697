#![warn(missing_docs)]

//! Finger table: per-node routing shortcuts across the ring.
//!
//! Entry `i` should reference the node responsible for
//! `(owner + 2^i) mod 2^m`. Entries are advisory hints, never
//! authoritative; a stale entry degrades lookup speed, not correctness,
//! so the table starts out degenerate with every entry pointing at the
//! owner and is refreshed one slot at a time by `fix_fingers`.

use serde::Deserialize;
use serde::Serialize;

use super::ident::Ident;
use super::ident::RingSpace;

/// Routing table of `m` shortcut entries for one node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FingerTable {
    owner: Ident,
    space: RingSpace,
    entries: Vec<Ident>,
    next_refresh: usize,
}

impl FingerTable {
    /// A fresh table with every entry pointing at `owner`, the
    /// singleton state that guarantees lookups always have somewhere
    /// to go before stabilization has run.
    pub fn new(owner: Ident, space: RingSpace) -> Self {
        Self {
            owner,
            space,
            entries: vec![owner; space.bits() as usize],
            next_refresh: 0,
        }
    }

    /// Number of entries, equal to the ring size exponent.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`; every ring has at least one finger slot.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at `index`, or `None` when the index is out of range.
    pub fn get(&self, index: usize) -> Option<Ident> {
        self.entries.get(index).copied()
    }

    /// Replace the entry at `index`. The caller must hold the owning
    /// node's state guard.
    pub fn set(&mut self, index: usize, id: Ident) {
        if index >= self.entries.len() {
            tracing::warn!(index, "finger index out of range, ignoring");
            return;
        }
        tracing::debug!(owner = %self.owner, index, entry = %id, "set finger entry");
        self.entries[index] = id;
    }

    /// The finger closest to `id` without reaching it: scan from the
    /// farthest entry down and return the first one strictly between
    /// the owner and `id`. Falls back to the owner itself, which is the
    /// fixed point that terminates a lookup walk.
    pub fn closest_preceding(&self, id: Ident) -> Ident {
        for i in (0..self.entries.len()).rev() {
            let entry = self.entries[i];
            if self.space.between(entry, self.owner, id) {
                return entry;
            }
        }
        self.owner
    }

    /// Rotate the refresh cursor and return the slot to fix next.
    /// Only one finger is refreshed per tick.
    pub fn advance_refresh(&mut self) -> usize {
        self.next_refresh = (self.next_refresh + 1) % self.entries.len();
        self.next_refresh
    }

    /// All entries in interval order.
    pub fn entries(&self) -> &[Ident] {
        &self.entries
    }
}
