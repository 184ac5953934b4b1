//! Peer records and slot bookkeeping.
//!
//! A [`Peer`] holds the per-node protocol state: its connection slots, the
//! table of known addresses, and the gossip relay state. All cross-peer
//! references are [`PeerId`]s resolved through the registry, which is the
//! only strong owner.
use std::collections::HashSet;

use crate::common::collections::{AddressBook, RandomState};
use crate::common::id::PeerId;
use crate::common::time::Tick;

/// Behavior discriminant.
///
/// The crawler holds no persistent slots: every connection it initiates is
/// one-shot, and it tracks the reachable population on behalf of the seeder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerKind {
    Regular,
    Crawler {
        /// Reachable online peers seen at the last crawl.
        good_nodes: Vec<PeerId>,
    },
}

/// A simulated peer.
#[derive(Debug, Clone)]
pub struct Peer {
    /// Stable identifier, rendered as a dotted IPv4 address.
    pub id: PeerId,
    pub kind: PeerKind,
    /// Whether this peer accepts inbound connections. Immutable configuration.
    pub reachable: bool,
    /// Lifecycle flag, flipped by `start` and `stop`.
    pub online: bool,
    /// Locally initiated connections.
    pub outbound: Vec<PeerId>,
    /// Remotely initiated connections.
    pub inbound: Vec<PeerId>,
    /// Addresses this peer knows about. Survives `stop`.
    pub known: AddressBook<PeerId, ()>,
    /// Relay targets for the current trickle epoch, at most two.
    pub trickle_targets: Vec<PeerId>,
    /// When the current trickle epoch began.
    pub trickle_epoch_start: Tick,
    /// How many times the trickle targets have been drawn.
    pub trickle_rotations: u64,
    /// Address batches queued for deferred delivery, keyed by target.
    pub pending_addr: AddressBook<PeerId, Vec<PeerId>>,
    /// Origins whose next small batch is suppressed.
    pub relayed_from: HashSet<PeerId, RandomState>,
    /// Connections to drop on the next maintenance tick.
    pub disconnect_queue: Vec<PeerId>,
}

impl Peer {
    pub fn new(id: PeerId, kind: PeerKind, reachable: bool, rng: &mut fastrand::Rng) -> Self {
        Self {
            id,
            kind,
            reachable,
            online: false,
            outbound: Vec::new(),
            inbound: Vec::new(),
            known: AddressBook::new(rng.fork()),
            trickle_targets: Vec::new(),
            trickle_epoch_start: Tick::default(),
            trickle_rotations: 0,
            pending_addr: AddressBook::new(rng.fork()),
            relayed_from: HashSet::with_hasher(RandomState::from(rng.fork())),
            disconnect_queue: Vec::new(),
        }
    }

    /// Whether this peer currently answers connection attempts: online and
    /// configured to accept inbound connections.
    pub fn is_reachable(&self) -> bool {
        self.online && self.reachable
    }

    pub fn is_crawler(&self) -> bool {
        matches!(self.kind, PeerKind::Crawler { .. })
    }

    /// The crawler's good set; empty for regular peers.
    pub fn good_nodes(&self) -> &[PeerId] {
        match &self.kind {
            PeerKind::Crawler { good_nodes } => good_nodes,
            PeerKind::Regular => &[],
        }
    }

    /// Total connection slots in use.
    pub fn slots(&self) -> usize {
        self.outbound.len() + self.inbound.len()
    }

    /// Whether `other` occupies a slot in either direction.
    pub fn is_connected(&self, other: &PeerId) -> bool {
        self.outbound.contains(other) || self.inbound.contains(other)
    }

    /// Remove `other` from whichever slot sequence contains it, reporting
    /// whether anything was held. Tolerates half-open bookkeeping.
    pub fn drop_slot(&mut self, other: &PeerId) -> bool {
        let before = self.slots();
        self.outbound.retain(|id| id != other);
        self.inbound.retain(|id| id != other);
        self.slots() != before
    }

    /// Queue a batch for deferred delivery to `target`, deduplicating per
    /// target. Appending nothing is a no-op.
    pub fn queue_addr(&mut self, target: PeerId, batch: &[PeerId]) {
        if batch.is_empty() {
            return;
        }
        if !self.pending_addr.contains(&target) {
            self.pending_addr.insert(target, Vec::new());
        }
        let queued = self
            .pending_addr
            .get_mut(&target)
            .expect("entry was just ensured");
        for id in batch {
            if !queued.contains(id) {
                queued.push(*id);
            }
        }
    }

    /// Drop all per-session state. The known table survives.
    pub fn clear_session(&mut self) {
        self.outbound.clear();
        self.inbound.clear();
        self.trickle_targets.clear();
        self.trickle_epoch_start = Tick::default();
        self.pending_addr.clear();
        self.relayed_from.clear();
        self.disconnect_queue.clear();
    }
}
