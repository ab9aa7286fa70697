#![warn(missing_docs)]

//! The cross-node call surface and its in-process implementation.
//!
//! Every read or write of another node's state goes through [Transport],
//! modeled as a suspending operation that can fail with
//! [Error::UnreachablePeer]. The protocol code never touches a remote
//! node directly, so an out-of-process deployment only needs to bridge
//! this trait to real RPC.
//!
//! [LocalNetwork] is the co-located implementation: an arena of nodes
//! keyed by [Ident]. Cross-node "references" are always identifier
//! lookups into the arena, never owning pointers, which preserves the
//! cyclic successor/predecessor graph without aliasing hazards.

use std::collections::hash_map::DefaultHasher;
use std::future::Future;
use std::hash::Hasher;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::error::Error;
use crate::error::Result;
use crate::protocol;
use crate::ring::Ident;
use crate::ring::Node;
use crate::ring::RingSpace;

/// Default allotted time for a single cross-node call.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_millis(500);

/// Hash function mapping application keys into raw ring positions.
/// Supplied by the embedding application; the algorithm choice is not
/// this crate's concern.
pub type KeyHashFn = Arc<dyn Fn(&[u8]) -> u128 + Send + Sync>;

/// The operations one node needs from a peer. A transport adapter
/// bridges these to network calls; every method may suspend and every
/// method may fail with [Error::UnreachablePeer].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Ask `peer` for its current successor.
    async fn successor_of(&self, peer: Ident) -> Result<Ident>;

    /// Ask `peer` for its current predecessor, which may not be
    /// established yet.
    async fn predecessor_of(&self, peer: Ident) -> Result<Option<Ident>>;

    /// Ask `peer` for its finger entry closest to `id` without
    /// reaching it.
    async fn closest_preceding(&self, peer: Ident, id: Ident) -> Result<Ident>;

    /// Ask `peer` to resolve the node owning `id`.
    async fn find_successor(&self, peer: Ident, id: Ident) -> Result<Ident>;

    /// Tell `peer` that `candidate` believes itself to be its
    /// predecessor.
    async fn notify(&self, peer: Ident, candidate: Ident) -> Result<()>;
}

/// A set of co-located nodes forming one ring, reached through direct
/// arena lookups with a timeout standing in for network latency bounds.
pub struct LocalNetwork {
    space: RingSpace,
    nodes: DashMap<Ident, Arc<Node>>,
    rpc_timeout: Duration,
    key_hash: KeyHashFn,
}

fn default_key_hash(key: &[u8]) -> u128 {
    let mut hasher = DefaultHasher::new();
    hasher.write(key);
    hasher.finish() as u128
}

impl LocalNetwork {
    /// An empty network over the given identifier space.
    pub fn new(space: RingSpace) -> Self {
        Self {
            space,
            nodes: DashMap::new(),
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            key_hash: Arc::new(default_key_hash),
        }
    }

    /// Override the per-call timeout.
    pub fn with_rpc_timeout(mut self, timeout: Duration) -> Self {
        self.rpc_timeout = timeout;
        self
    }

    /// Override the key hash function.
    pub fn with_key_hash(mut self, key_hash: KeyHashFn) -> Self {
        self.key_hash = key_hash;
        self
    }

    /// The identifier space this network rings over.
    pub fn space(&self) -> RingSpace {
        self.space
    }

    /// Create a node in singleton state. It owns no position on any
    /// ring until [LocalNetwork::join] runs.
    pub fn create(&self, raw: u128) -> Result<Arc<Node>> {
        let id = self.space.ident(raw)?;
        match self.nodes.entry(id) {
            Entry::Occupied(_) => Err(Error::DuplicateIdentifier(id)),
            Entry::Vacant(slot) => {
                let node = Arc::new(Node::new(id, self.space));
                slot.insert(node.clone());
                Ok(node)
            }
        }
    }

    /// Resolve a node handle. An absent identifier reads as a departed
    /// peer.
    pub fn node(&self, id: Ident) -> Result<Arc<Node>> {
        self.nodes
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(Error::UnreachablePeer(id))
    }

    /// Detach a node from the arena. Peers still holding its identifier
    /// will observe [Error::UnreachablePeer]; repairing their state is
    /// the departure-recovery machinery's job, not this crate's.
    pub fn remove(&self, id: Ident) -> Option<Arc<Node>> {
        self.nodes.remove(&id).map(|(_, node)| node)
    }

    /// Identifiers of all registered nodes, in no particular order.
    pub fn ids(&self) -> Vec<Ident> {
        self.nodes.iter().map(|entry| *entry.key()).collect()
    }

    /// Map an application key onto the ring.
    pub fn key_ident(&self, key: &[u8]) -> Ident {
        self.space.fold((self.key_hash)(key))
    }

    /// Attach `node` to the ring `existing` belongs to, or form a
    /// singleton ring when `existing` is `None`. On failure the node
    /// keeps its pre-join state and the caller may retry.
    pub async fn join(&self, node: Ident, existing: Option<Ident>) -> Result<()> {
        let node = self.node(node)?;
        protocol::join(self, &node, existing).await
    }

    /// Run one stabilization pass for `node`.
    pub async fn stabilize(&self, node: Ident) -> Result<()> {
        let node = self.node(node)?;
        protocol::stabilize(&self.space, self, &node).await
    }

    /// Refresh one finger entry of `node`.
    pub async fn fix_fingers(&self, node: Ident) -> Result<()> {
        let node = self.node(node)?;
        protocol::fix_fingers(&self.space, self, &node).await
    }

    /// Resolve the node owning `id`, asking `from` first. The public
    /// lookup entry point.
    pub async fn lookup(&self, from: Ident, id: Ident) -> Result<Ident> {
        if !self.space.contains(id) {
            return Err(Error::InvalidIdentifier {
                id: id.raw(),
                bits: self.space.bits(),
            });
        }
        Transport::find_successor(self, from, id).await
    }

    /// Follow successor links from `start` until the walk returns to
    /// it. On a converged ring this visits every node exactly once;
    /// the walk stops early rather than looping if the ring is not
    /// closed.
    pub fn ring_order(&self, start: Ident) -> Result<Vec<Ident>> {
        let mut order = vec![start];
        let mut current = self.node(start)?.successor()?;
        while current != start && order.len() <= self.nodes.len() {
            order.push(current);
            current = self.node(current)?.successor()?;
        }
        Ok(order)
    }

    pub(crate) async fn rpc<T, F>(&self, peer: Ident, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match tokio::time::timeout(self.rpc_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(Error::UnreachablePeer(peer)),
        }
    }
}

#[async_trait]
impl Transport for LocalNetwork {
    async fn successor_of(&self, peer: Ident) -> Result<Ident> {
        self.rpc(peer, async { self.node(peer)?.successor() }).await
    }

    async fn predecessor_of(&self, peer: Ident) -> Result<Option<Ident>> {
        self.rpc(peer, async { self.node(peer)?.predecessor() })
            .await
    }

    async fn closest_preceding(&self, peer: Ident, id: Ident) -> Result<Ident> {
        self.rpc(peer, async { self.node(peer)?.closest_preceding(id) })
            .await
    }

    async fn find_successor(&self, peer: Ident, id: Ident) -> Result<Ident> {
        let node = self.node(peer)?;
        if !node.is_joined()? {
            return Err(Error::RingNotReady(peer));
        }
        protocol::find_successor(&self.space, self, peer, id).await
    }

    async fn notify(&self, peer: Ident, candidate: Ident) -> Result<()> {
        self.rpc(peer, async { self.node(peer)?.notify(candidate) })
            .await
    }
}

#[cfg(test)]
mod tests {
    use futures::future;

    use super::*;

    fn network() -> LocalNetwork {
        LocalNetwork::new(RingSpace::new(3).unwrap())
    }

    #[tokio::test]
    async fn test_create_rejects_duplicates() {
        let net = network();
        net.create(5).unwrap();
        assert_eq!(
            net.create(5).unwrap_err(),
            Error::DuplicateIdentifier(net.space().ident(5).unwrap())
        );
    }

    #[tokio::test]
    async fn test_create_rejects_out_of_range() {
        let net = network();
        assert_eq!(
            net.create(8).unwrap_err(),
            Error::InvalidIdentifier { id: 8, bits: 3 }
        );
    }

    #[tokio::test]
    async fn test_unknown_peer_is_unreachable() {
        let net = network();
        net.create(5).unwrap();
        let ghost = net.space().ident(2).unwrap();
        assert_eq!(
            net.successor_of(ghost).await.unwrap_err(),
            Error::UnreachablePeer(ghost)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_rpc_timeout_maps_to_unreachable() {
        let net = network().with_rpc_timeout(Duration::from_millis(10));
        let peer = net.space().ident(1).unwrap();
        let stalled: future::Pending<Result<Ident>> = future::pending();
        assert_eq!(
            net.rpc(peer, stalled).await.unwrap_err(),
            Error::UnreachablePeer(peer)
        );
    }

    #[tokio::test]
    async fn test_key_ident_is_in_space() {
        let net = network();
        for key in [&b"alpha"[..], b"beta", b"gamma", b""] {
            assert!(net.space().contains(net.key_ident(key)));
        }
    }

    #[tokio::test]
    async fn test_key_hash_override() {
        let net = network().with_key_hash(Arc::new(|key: &[u8]| key.len() as u128));
        assert_eq!(net.key_ident(b"abcd").raw(), 4);
        assert_eq!(net.key_ident(b"123456789").raw(), 1);
    }
}
