//! Error of chord-ring.

use crate::ring::Ident;

/// A wrap `Result` contains custom errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by ring construction, lookups and stabilization ticks.
/// None of them is fatal; a failed tick leaves node state as it was and
/// the next scheduled tick retries.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    #[error("ring size exponent must be in 1..=128, got {0}")]
    InvalidRingSize(u32),

    #[error("identifier {id} is outside the 2^{bits} identifier space")]
    InvalidIdentifier { id: u128, bits: u32 },

    #[error("a node with identifier {0} already exists on this ring")]
    DuplicateIdentifier(Ident),

    #[error("peer {0} is unreachable or has departed")]
    UnreachablePeer(Ident),

    #[error("node {0} has not joined a ring")]
    RingNotReady(Ident),

    #[error("node state lock poisoned")]
    StateLockPoisoned,
}
