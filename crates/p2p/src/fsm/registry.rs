//! The address registry: identifier allocation and peer ownership.
use std::collections::HashMap;

use tracing::error;

use crate::common::collections::RandomState;
use crate::common::id::PeerId;
use crate::fsm::peer::Peer;

/// Draws attempted before giving up on a fresh identifier.
const MAX_ALLOC_ATTEMPTS: usize = 64;

/// Owns every peer in the simulation.
///
/// Identifiers are drawn at random from the 32-bit space and re-drawn on
/// collision, so lookup is collision-free. Peers are inserted once and live
/// until the registry is dropped.
#[derive(Debug)]
pub struct Registry {
    peers: HashMap<PeerId, Peer, RandomState>,
    order: Vec<PeerId>,
}

impl Registry {
    pub fn new(rng: fastrand::Rng) -> Self {
        Self {
            peers: HashMap::with_hasher(RandomState::from(rng)),
            order: Vec::new(),
        }
    }

    /// Allocate an unused identifier.
    ///
    /// Returns `None` when the space is too contended to find one; callers
    /// omit the peer and carry on.
    pub fn alloc_id(&self, rng: &mut fastrand::Rng) -> Option<PeerId> {
        for _ in 0..MAX_ALLOC_ATTEMPTS {
            let id = PeerId::from_bits(rng.u32(..));
            if !self.peers.contains_key(&id) {
                return Some(id);
            }
        }
        error!(target: "sim", "identifier space exhausted after {} draws", MAX_ALLOC_ATTEMPTS);
        None
    }

    /// Insert a freshly allocated peer.
    pub fn insert(&mut self, peer: Peer) {
        debug_assert!(!self.peers.contains_key(&peer.id));

        self.order.push(peer.id);
        self.peers.insert(peer.id, peer);
    }

    pub fn get(&self, id: &PeerId) -> Option<&Peer> {
        self.peers.get(id)
    }

    pub fn get_mut(&mut self, id: &PeerId) -> Option<&mut Peer> {
        self.peers.get_mut(id)
    }

    pub fn contains(&self, id: &PeerId) -> bool {
        self.peers.contains_key(id)
    }

    /// Whether `id` resolves to a peer that currently answers connection
    /// attempts. A dangling identifier is simply unreachable.
    pub fn is_reachable(&self, id: PeerId) -> bool {
        self.peers.get(&id).map_or(false, Peer::is_reachable)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate over identifiers in allocation order.
    pub fn ids(&self) -> impl Iterator<Item = &PeerId> {
        self.order.iter()
    }

    /// Iterate over peers in allocation order.
    pub fn iter(&self) -> impl Iterator<Item = &Peer> {
        self.order
            .iter()
            .map(move |id| self.peers.get(id).expect("order and map are in sync"))
    }
}
