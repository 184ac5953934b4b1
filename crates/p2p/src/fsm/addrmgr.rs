//! Address gossip: the `version`/`getaddr`/`addr` handlers and the trickle
//! relay.
use std::fmt;

use crate::common::id::PeerId;
use crate::fsm::wire::Message;
use crate::fsm::Overlay;

/// Maximum number of addresses in a single `addr` message.
pub const MAX_ADDR_ADDRESSES: usize = 1000;
/// Legacy soft bound on `getaddr` replies, always superseded by
/// [`MAX_ADDR_ADDRESSES`].
const GETADDR_MAX: usize = 2500;
/// Percentage of the known table disclosed by a `getaddr` reply.
const GETADDR_MAX_PCT: usize = 23;
/// Largest batch treated as a relayable peer announcement.
pub const MAX_RELAY_BATCH: usize = 10;
/// Ticks after which trickle targets are re-drawn: 24 hours of modeled time.
pub const TRICKLE_EPOCH: u64 = 86_400;
/// Trickle fan-out: relay targets drawn per epoch.
const TRICKLE_OUT: usize = 2;

/// An event originating in address gossip.
#[derive(Debug, Clone)]
pub enum Event {
    /// Peer addresses have been received.
    AddressesReceived {
        /// The receiving peer.
        peer: PeerId,
        /// Number of addresses received.
        count: usize,
        /// Source of the addresses.
        source: PeerId,
    },
    /// Trickle targets were re-drawn.
    TrickleRotated {
        peer: PeerId,
        /// Number of targets drawn.
        targets: usize,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AddressesReceived {
                peer,
                count,
                source,
            } => {
                write!(f, "{}: received {} address(es) from {}", peer, count, source)
            }
            Self::TrickleRotated { peer, targets } => {
                write!(f, "{}: rotated {} trickle target(s)", peer, targets)
            }
        }
    }
}

impl Overlay {
    /// Handle a `version` received by `id` from `sender`.
    ///
    /// An inbound `version` is the opening of a handshake: echo it and
    /// remember the sender. Otherwise it is the reply to our own outbound
    /// `version`: advertise ourselves on the next trickle and ask for the
    /// sender's address book, suppressing one round of reflected gossip.
    pub(crate) fn receive_version(&mut self, id: PeerId, sender: PeerId) {
        let from_inbound = match self.peers.get(&id) {
            Some(peer) => peer.inbound.contains(&sender),
            None => return,
        };
        if from_inbound {
            let sender_reachable = self.is_reachable(sender);
            if let Some(peer) = self.peers.get_mut(&id) {
                if sender_reachable && sender != id {
                    peer.known.insert(sender, ());
                }
            }
            self.send(id, sender, Message::Version);
        } else {
            if let Some(peer) = self.peers.get_mut(&id) {
                peer.queue_addr(sender, &[id]);
                peer.relayed_from.insert(sender);
            }
            self.send(id, sender, Message::GetAddr);
        }
    }

    /// Handle a `getaddr` received by `id`: reply with a bounded uniform
    /// sample of the known table, drawn without replacement.
    pub(crate) fn receive_getaddr(&mut self, id: PeerId, sender: PeerId) {
        let sample = {
            let Some(peer) = self.peers.get(&id) else {
                return;
            };
            let mut pool: Vec<PeerId> = peer.known.keys().copied().collect();
            let size = (pool.len() * GETADDR_MAX_PCT / 100)
                .min(GETADDR_MAX)
                .min(MAX_ADDR_ADDRESSES);
            self.rng.shuffle(&mut pool);
            pool.truncate(size);
            pool
        };
        self.send(id, sender, Message::Addr(sample));
    }

    /// Handle an `addr` batch received by `id` from `origin`.
    pub(crate) fn receive_addr(&mut self, id: PeerId, origin: PeerId, batch: Vec<PeerId>) {
        if !batch.is_empty() {
            self.outbox.event(Event::AddressesReceived {
                peer: id,
                count: batch.len(),
                source: origin,
            });
        }

        // Absorb reachable entries into the known table.
        let fresh: Vec<PeerId> = batch
            .iter()
            .copied()
            .filter(|n| *n != id && self.is_reachable(*n))
            .collect();
        {
            let Some(peer) = self.peers.get_mut(&id) else {
                return;
            };
            for n in fresh {
                peer.known.insert(n, ());
            }
        }

        self.rotate_trickle(id);

        let Some(peer) = self.peers.get_mut(&id) else {
            return;
        };
        // Small batches are peer announcements and get relayed; bulk
        // `getaddr` replies are absorbed only. Delivery is deferred to the
        // trickle step so a burst of announcements cannot fan out within a
        // single tick.
        if batch.len() <= MAX_RELAY_BATCH && !peer.relayed_from.contains(&origin) {
            let targets = peer.trickle_targets.clone();
            for target in targets {
                peer.queue_addr(target, &batch);
            }
        }
        // Anything under the hard cap lifts the origin's suppression.
        if batch.len() < MAX_ADDR_ADDRESSES {
            peer.relayed_from.remove(&origin);
        }
    }

    /// Re-draw trickle targets when the epoch has expired or no targets were
    /// ever drawn. Runs even with an empty outbound set, in which case the
    /// target set stays empty and relaying is a no-op until a slot fills.
    pub(crate) fn rotate_trickle(&mut self, id: PeerId) {
        let now = self.clock;
        let Some(peer) = self.peers.get_mut(&id) else {
            return;
        };
        if !peer.trickle_targets.is_empty() && now < peer.trickle_epoch_start + TRICKLE_EPOCH {
            return;
        }
        peer.trickle_epoch_start = now;
        peer.trickle_rotations += 1;
        peer.trickle_targets = match peer.outbound.len() {
            n if n <= TRICKLE_OUT => peer.outbound.clone(),
            n => {
                let first = self.rng.usize(..n);
                let mut second = self.rng.usize(..n);
                while second == first {
                    second = self.rng.usize(..n);
                }
                vec![peer.outbound[first], peer.outbound[second]]
            }
        };
        let targets = peer.trickle_targets.len();
        if targets > 0 {
            self.outbox.event(Event::TrickleRotated { peer: id, targets });
        }
    }

    /// The trickle step of maintenance: pick one random outbound neighbor
    /// and flush its queued batch, if any. At most one batch leaves per
    /// tick, which realizes the ~100ms/probability-1/n address gossip of
    /// the modeled protocol.
    pub(crate) fn trickle(&mut self, id: PeerId) {
        let (target, batch) = {
            let Some(peer) = self.peers.get_mut(&id) else {
                return;
            };
            if peer.outbound.is_empty() {
                return;
            }
            let target = peer.outbound[self.rng.usize(..peer.outbound.len())];
            match peer.pending_addr.remove(&target) {
                Some(batch) => (target, batch),
                None => return,
            }
        };
        self.send(id, target, Message::Addr(batch));
    }
}
