#![warn(missing_docs)]

//! Per-node mutable state and the lock discipline around it.
//!
//! Each [Node] owns exactly one mutex covering its successor,
//! predecessor and finger entries. Every accessor copies values out and
//! drops the guard before returning, and no method ever exposes the
//! guard itself. Cross-node reads therefore cannot nest two guards,
//! which is what keeps concurrent stabilization of adjacent nodes free
//! of deadlock cycles.

use std::sync::Mutex;
use std::sync::MutexGuard;

use serde::Deserialize;
use serde::Serialize;

use super::finger::FingerTable;
use super::ident::Ident;
use super::ident::RingSpace;
use crate::error::Error;
use crate::error::Result;

/// One ring participant. Shared via `Arc`; other nodes refer to it only
/// by [Ident], never by pointer.
#[derive(Debug)]
pub struct Node {
    id: Ident,
    space: RingSpace,
    state: Mutex<NodeState>,
}

#[derive(Debug)]
struct NodeState {
    successor: Ident,
    /// `None` means "not yet established", which is distinct from
    /// absent: every live node on a populated ring gains a predecessor
    /// once notify has run.
    predecessor: Option<Ident>,
    fingers: FingerTable,
    joined: bool,
}

/// A copied-out view of a node's ring position, safe to hold without
/// any guard.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopoSnapshot {
    /// The node's own identifier.
    pub id: Ident,
    /// Current successor.
    pub successor: Ident,
    /// Current predecessor, if established.
    pub predecessor: Option<Ident>,
}

impl Node {
    /// A node in degenerate singleton state: successor and every finger
    /// entry point at itself, predecessor unknown, not yet joined.
    pub(crate) fn new(id: Ident, space: RingSpace) -> Self {
        Self {
            id,
            space,
            state: Mutex::new(NodeState {
                successor: id,
                predecessor: None,
                fingers: FingerTable::new(id, space),
                joined: false,
            }),
        }
    }

    /// The node's immutable identifier.
    pub fn id(&self) -> Ident {
        self.id
    }

    fn lock(&self) -> Result<MutexGuard<NodeState>> {
        self.state.lock().map_err(|_| Error::StateLockPoisoned)
    }

    /// Current successor.
    pub fn successor(&self) -> Result<Ident> {
        Ok(self.lock()?.successor)
    }

    pub(crate) fn set_successor(&self, id: Ident) -> Result<()> {
        let mut state = self.lock()?;
        if state.successor != id {
            tracing::debug!(node = %self.id, successor = %id, "successor updated");
            state.successor = id;
        }
        Ok(())
    }

    /// Current predecessor, `None` until established.
    pub fn predecessor(&self) -> Result<Option<Ident>> {
        Ok(self.lock()?.predecessor)
    }

    /// Whether this node has joined a ring (a singleton formation
    /// counts).
    pub fn is_joined(&self) -> Result<bool> {
        Ok(self.lock()?.joined)
    }

    /// Become a ring of one: the node is its own successor and
    /// predecessor and owns the whole identifier space.
    pub(crate) fn form_singleton(&self) -> Result<()> {
        let mut state = self.lock()?;
        state.successor = self.id;
        state.predecessor = Some(self.id);
        state.joined = true;
        tracing::debug!(node = %self.id, "formed singleton ring");
        Ok(())
    }

    /// Take a position on an existing ring: adopt the successor the
    /// lookup resolved, reset the predecessor to unknown and mark the
    /// node joined. One guard, one transition, so a failed join earlier
    /// in the call chain leaves the pre-join state untouched.
    pub(crate) fn adopt_ring_position(&self, successor: Ident) -> Result<()> {
        let mut state = self.lock()?;
        state.successor = successor;
        state.predecessor = None;
        state.joined = true;
        tracing::debug!(node = %self.id, successor = %successor, "joined ring");
        Ok(())
    }

    /// Handle a notify from `candidate`, which believes itself to be
    /// this node's predecessor. Adopt it when no predecessor is
    /// established or when it sits strictly between the current
    /// predecessor and this node on the ring.
    pub fn notify(&self, candidate: Ident) -> Result<()> {
        if candidate == self.id {
            return Ok(());
        }
        let mut state = self.lock()?;
        let adopt = match state.predecessor {
            None => true,
            Some(current) => self.space.between(candidate, current, self.id),
        };
        if adopt {
            tracing::debug!(node = %self.id, predecessor = %candidate, "predecessor updated");
            state.predecessor = Some(candidate);
        }
        Ok(())
    }

    /// The finger entry closest to `id` without reaching it, falling
    /// back to this node itself.
    pub fn closest_preceding(&self, id: Ident) -> Result<Ident> {
        Ok(self.lock()?.fingers.closest_preceding(id))
    }

    pub(crate) fn set_finger(&self, index: usize, id: Ident) -> Result<()> {
        self.lock()?.fingers.set(index, id);
        Ok(())
    }

    /// Rotate the finger refresh cursor and return the slot index plus
    /// the identifier whose owner that slot should reference. The
    /// cursor advances even when the subsequent lookup fails, so a
    /// stuck target cannot starve the other slots.
    pub(crate) fn next_finger_target(&self) -> Result<(usize, Ident)> {
        let mut state = self.lock()?;
        let index = state.fingers.advance_refresh();
        let target = self.space.finger_start(self.id, index as u32);
        Ok((index, target))
    }

    /// Finger entry at `index`, if in range.
    pub fn finger(&self, index: usize) -> Result<Option<Ident>> {
        Ok(self.lock()?.fingers.get(index))
    }

    /// Copy out the node's ring position.
    pub fn snapshot(&self) -> Result<TopoSnapshot> {
        let state = self.lock()?;
        Ok(TopoSnapshot {
            id: self.id,
            successor: state.successor,
            predecessor: state.predecessor,
        })
    }
}
