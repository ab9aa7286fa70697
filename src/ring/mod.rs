#![warn(missing_docs)]
//! Ring primitives: identifier arithmetic, finger tables and per-node
//! state. The lookup and stabilization procedures that operate on these
//! live in [crate::protocol].

pub mod finger;
pub mod ident;
pub mod node;

pub use finger::FingerTable;
pub use ident::Ident;
pub use ident::RingSpace;
pub use node::Node;
pub use node::TopoSnapshot;
