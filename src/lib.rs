//! Routing core of a Chord-style distributed hash table.
//!
//! A set of logical nodes, each at a position on a `2^m`-slot
//! identifier ring, cooperatively resolve which node owns any given
//! identifier and keep their routing state correct as membership
//! changes. Ref: <https://pdos.csail.mit.edu/papers/ton:chord/paper-ton.pdf>
//!
//! - [ring] holds the primitives: [ring::RingSpace] for modular
//!   interval arithmetic, [ring::FingerTable] for the per-node routing
//!   shortcuts, and [ring::Node] for the lockable per-node record.
//! - [protocol] implements the algorithms over those primitives:
//!   `find_successor`/`find_predecessor` resolve an identifier to its
//!   owner in O(log N) hops, and `join`/`stabilize`/`notify`/
//!   `fix_fingers` converge the ring topology after churn.
//! - [transport] defines the RPC surface a deployment must bridge,
//!   plus [transport::LocalNetwork], the in-process arena that reaches
//!   co-located nodes by identifier with a timeout on every call.
//! - [stabilizer] drives the periodic ticks the protocol itself never
//!   schedules.
//!
//! Correctness rests on successor pointers alone: finger entries are
//! advisory hints that only affect lookup speed. Every interval test
//! on the ring reduces to the clockwise-between predicate in
//! [ring::RingSpace], which handles wraparound; plain integer
//! comparison is unsound here.
//!
//! What this crate leaves to the embedding application: the hash
//! function mapping keys to identifiers, storage of key/value payloads
//! (the ring only locates owners), departure/failure detection, and
//! the schedule on which stabilization ticks run.

pub mod error;
pub mod protocol;
pub mod ring;
pub mod stabilizer;
pub mod transport;

pub use error::Error;
pub use error::Result;
pub use ring::FingerTable;
pub use ring::Ident;
pub use ring::Node;
pub use ring::RingSpace;
pub use ring::TopoSnapshot;
pub use stabilizer::Stabilizer;
pub use transport::LocalNetwork;
pub use transport::Transport;
