#![warn(missing_docs)]

//! The Chord lookup and stabilization procedures.
//!
//! Lookups are a pure read path: starting from any node, jump through
//! closest-preceding fingers until the target identifier falls inside
//! `(candidate, candidate.successor]`. Stabilization is the self-healing
//! write path: `join` attaches a node with a correct successor,
//! `stabilize` and `notify` repair successor/predecessor pointers after
//! churn, and `fix_fingers` refreshes routing hints one slot per tick.
//! All of it is generic over [Transport]; nothing here assumes the
//! peers share a process.
//!
//! Correctness depends only on successors converging. Fingers are an
//! optimization: with them fresh a lookup takes O(log N) hops, with
//! them stale it degrades to walking the successor chain.

use crate::error::Result;
use crate::ring::Ident;
use crate::ring::Node;
use crate::ring::RingSpace;
use crate::transport::Transport;

/// Resolve the node that immediately precedes `id` on the ring,
/// starting the walk at `start`.
///
/// Each hop strictly decreases the clockwise distance to `id`, and the
/// walk also stops when a candidate returns itself as its own closest
/// preceding finger, so it terminates on a ring of any size, including
/// a singleton whose successor is itself.
pub async fn find_predecessor<T>(
    space: &RingSpace,
    transport: &T,
    start: Ident,
    id: Ident,
) -> Result<Ident>
where
    T: Transport + ?Sized,
{
    let mut current = start;
    loop {
        let successor = transport.successor_of(current).await?;
        if space.in_open_closed(id, current, successor) {
            return Ok(current);
        }
        let next = transport.closest_preceding(current, id).await?;
        if next == current {
            // Fixed point: no finger gets closer, the walk is done.
            return Ok(current);
        }
        tracing::debug!(from = %current, to = %next, target = %id, "lookup hop");
        current = next;
    }
}

/// Resolve the node that owns `id`: the successor of its predecessor.
pub async fn find_successor<T>(
    space: &RingSpace,
    transport: &T,
    start: Ident,
    id: Ident,
) -> Result<Ident>
where
    T: Transport + ?Sized,
{
    let predecessor = find_predecessor(space, transport, start, id).await?;
    transport.successor_of(predecessor).await
}

/// Attach `node` to the ring that `existing` belongs to, or form a
/// singleton ring when `existing` is `None`.
///
/// The successor is resolved through `existing` before any local state
/// changes, so an unreachable peer leaves the node exactly as it was.
/// Convergence of predecessors and of other nodes' successors is not
/// this call's job; it happens through subsequent stabilize ticks.
pub async fn join<T>(transport: &T, node: &Node, existing: Option<Ident>) -> Result<()>
where
    T: Transport + ?Sized,
{
    match existing {
        None => node.form_singleton(),
        Some(peer) => {
            let successor = transport.find_successor(peer, node.id()).await?;
            node.adopt_ring_position(successor)
        }
    }
}

/// One stabilization pass for `node`: check whether the successor's
/// predecessor is a closer successor, adopt it if so, then notify the
/// (possibly new) successor of this node's existence.
///
/// An already-applied successor update is retained even when the
/// closing notify fails; the next tick retries the rest.
pub async fn stabilize<T>(space: &RingSpace, transport: &T, node: &Node) -> Result<()>
where
    T: Transport + ?Sized,
{
    let successor = node.successor()?;
    if let Some(x) = transport.predecessor_of(successor).await? {
        if space.between(x, node.id(), successor) {
            tracing::debug!(node = %node.id(), old = %successor, new = %x, "stabilize found closer successor");
            node.set_successor(x)?;
        }
    }
    let successor = node.successor()?;
    transport.notify(successor, node.id()).await
}

/// Refresh one finger entry of `node` by resolving the owner of
/// `(node.id + 2^i) mod 2^m` for the next slot `i` in rotation.
///
/// The rotation cursor advances before the lookup, so a failing target
/// does not pin the refresh on one slot forever.
pub async fn fix_fingers<T>(space: &RingSpace, transport: &T, node: &Node) -> Result<()>
where
    T: Transport + ?Sized,
{
    let (index, target) = node.next_finger_target()?;
    let owner = find_successor(space, transport, node.id(), target).await?;
    node.set_finger(index, owner)
}
