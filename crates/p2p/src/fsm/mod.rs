//! The overlay protocol state machine.
//!
//! [`Overlay`] owns the peer table and drives every peer-to-peer
//! interaction. Message sends are direct, synchronous invocations of the
//! receiver's handler on the sender's stack; ordering within a tick is the
//! natural stack order, and the only suspension point is the tick boundary
//! advanced by the driver.
use tracing::trace;

pub mod addrmgr;
pub mod crawler;
pub mod event;
pub mod output;
pub mod peer;
pub mod peermgr;
pub mod registry;
pub mod seeder;
pub mod wire;

use crate::common::id::PeerId;
use crate::common::time::Tick;
use self::output::Outbox;
use self::peer::{Peer, PeerKind};
use self::peermgr::{MAX_CONNECTED_PEERS, MAX_OUTBOUND_PEERS};
use self::registry::Registry;
use self::seeder::Seeder;
use self::wire::Message;

/// The live overlay: every peer, their lifecycle membership, and the
/// bootstrap oracle.
#[derive(Debug)]
pub struct Overlay {
    /// Current simulation time. Written only by the driver.
    pub clock: Tick,
    /// Strong owner of every peer.
    pub peers: Registry,
    /// Online peers, in the order they came online.
    pub online: Vec<PeerId>,
    /// Offline peers, in the order they went offline.
    pub offline: Vec<PeerId>,
    /// The bootstrap DNS oracle.
    pub seeder: Seeder,
    /// Events pending pickup by the driver.
    pub outbox: Outbox,
    pub rng: fastrand::Rng,
}

impl Overlay {
    /// Create an overlay with its seeder and crawler installed. The seeder
    /// cache is force-built so clients can query immediately.
    pub fn new(mut rng: fastrand::Rng) -> Self {
        let mut peers = Registry::new(rng.fork());
        let crawler_id = peers
            .alloc_id(&mut rng)
            .expect("a fresh registry has free identifiers");
        let mut crawler = Peer::new(
            crawler_id,
            PeerKind::Crawler {
                good_nodes: Vec::new(),
            },
            true,
            &mut rng,
        );
        crawler.online = true;
        peers.insert(crawler);

        let mut overlay = Self {
            clock: Tick::default(),
            peers,
            online: vec![crawler_id],
            offline: Vec::new(),
            seeder: Seeder::new(crawler_id),
            outbox: Outbox::default(),
            rng,
        };
        overlay.cache_hit(true);
        overlay
    }

    /// Whether `id` resolves to a peer that currently answers connection
    /// attempts.
    pub fn is_reachable(&self, id: PeerId) -> bool {
        self.peers.is_reachable(id)
    }

    /// Deliver a message. The receiver's handler runs before this returns;
    /// messages to offline or unknown peers are dropped.
    pub(crate) fn send(&mut self, from: PeerId, to: PeerId, msg: Message) {
        let Some(receiver) = self.peers.get(&to) else {
            return;
        };
        if !receiver.online {
            return;
        }
        trace!(target: "p2p", "{} -> {}: {}", from, to, msg);

        match msg {
            Message::Version => self.receive_version(to, from),
            Message::GetAddr => self.receive_getaddr(to, from),
            Message::Addr(batch) => self.receive_addr(to, from, batch),
        }
    }

    /// Record `id` as online, preserving membership disjointness.
    pub(crate) fn set_online(&mut self, id: PeerId) {
        if !self.online.contains(&id) {
            self.online.push(id);
        }
        self.offline.retain(|p| *p != id);
    }

    /// Record `id` as offline, preserving membership disjointness.
    pub(crate) fn set_offline(&mut self, id: PeerId) {
        if !self.offline.contains(&id) {
            self.offline.push(id);
        }
        self.online.retain(|p| *p != id);
    }

    /// Slot bookkeeping invariants, checked after maintenance in debug
    /// builds.
    pub(crate) fn assert_invariants(&self, id: PeerId) {
        let Some(peer) = self.peers.get(&id) else {
            return;
        };
        debug_assert!(peer.outbound.len() <= MAX_OUTBOUND_PEERS);
        debug_assert!(peer.slots() <= MAX_CONNECTED_PEERS);
        debug_assert!(!peer.outbound.contains(&id), "{} connected to itself", id);
        debug_assert!(!peer.inbound.contains(&id), "{} connected to itself", id);
        debug_assert!(!peer.known.contains(&id), "{} knows itself", id);

        for n in &peer.outbound {
            debug_assert!(
                !peer.inbound.contains(n),
                "{} holds {} in both directions",
                id,
                n
            );
            if let Some(other) = self.peers.get(n) {
                debug_assert!(
                    other.inbound.contains(&id),
                    "{} -> {} has no inbound mirror",
                    id,
                    n
                );
            }
        }
        for n in &peer.inbound {
            if let Some(other) = self.peers.get(n) {
                debug_assert!(
                    other.outbound.contains(&id),
                    "{} <- {} has no outbound mirror",
                    id,
                    n
                );
            }
        }
    }
}
