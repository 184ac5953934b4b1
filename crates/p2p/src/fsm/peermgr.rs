//! Connection slot management: the per-pair state machine, peer lifecycle,
//! and per-tick maintenance.
use std::fmt;

use crate::common::id::PeerId;
use crate::fsm::seeder::MAX_SEED_PEERS;
use crate::fsm::wire::Message;
use crate::fsm::Overlay;

/// Maximum number of locally initiated connections per peer.
pub const MAX_OUTBOUND_PEERS: usize = 8;
/// Maximum number of connections per peer, both directions combined.
pub const MAX_CONNECTED_PEERS: usize = 125;
/// Outbound count below which a booting peer falls back to the seeder.
pub const MIN_OUTBOUND_PEERS: usize = 2;
/// Sampling rounds allowed per `fill_connections` call. Loose on purpose:
/// the tick-driven maintenance loop is the retry mechanism.
const FILL_ROUNDS: usize = 100;

/// Why a link was torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    /// The slot belonged to a one-shot probe whose tick has passed.
    OneShot,
    /// The remote stopped answering.
    PeerUnreachable,
    /// The local peer is going offline.
    Stopping,
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OneShot => write!(f, "one-shot release"),
            Self::PeerUnreachable => write!(f, "peer unreachable"),
            Self::Stopping => write!(f, "going offline"),
        }
    }
}

/// An event originating in connection management.
#[derive(Debug, Clone)]
pub enum Event {
    /// A connection was established.
    Connected {
        origin: PeerId,
        dest: PeerId,
        /// Slots in use at the origin, after the connect.
        slots: usize,
        one_shot: bool,
    },
    /// A connection was torn down.
    Disconnected {
        origin: PeerId,
        dest: PeerId,
        reason: DisconnectReason,
    },
    /// A peer came online.
    Started(PeerId),
    /// A peer went offline.
    Stopped(PeerId),
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected {
                origin,
                dest,
                slots,
                one_shot,
            } => {
                write!(
                    f,
                    "{} -> {} [{}/{}]{}",
                    origin,
                    dest,
                    slots,
                    MAX_CONNECTED_PEERS,
                    if *one_shot { " (one-shot)" } else { "" }
                )
            }
            Self::Disconnected {
                origin,
                dest,
                reason,
            } => {
                write!(f, "{}: disconnected from {} ({})", origin, dest, reason)
            }
            Self::Started(id) => write!(f, "{}: started", id),
            Self::Stopped(id) => write!(f, "{}: stopped", id),
        }
    }
}

impl Overlay {
    /// Attempt a locally initiated connection from `origin` to `dest`.
    ///
    /// Fails fast when the destination is the origin itself, unreachable
    /// (which also evicts it from the known table), already connected in
    /// either direction, or when either side's slots are saturated. On
    /// success the pair invariant holds before control returns: `dest` sits
    /// in `origin`'s outbound and `origin` in `dest`'s inbound.
    pub fn connect(&mut self, origin: PeerId, dest: PeerId, one_shot: bool) -> bool {
        if origin == dest {
            return false;
        }
        if !self.is_reachable(dest) {
            // A sampled address that no longer answers is stale.
            if let Some(peer) = self.peers.get_mut(&origin) {
                peer.known.remove(&dest);
            }
            return false;
        }
        {
            let Some(peer) = self.peers.get(&origin) else {
                return false;
            };
            if peer.outbound.len() >= MAX_OUTBOUND_PEERS
                || peer.slots() >= MAX_CONNECTED_PEERS
                || peer.is_connected(&dest)
            {
                return false;
            }
        }
        if !self.inbound_accept(dest, origin) {
            return false;
        }

        let peer = self
            .peers
            .get_mut(&origin)
            .expect("origin was present above");
        peer.outbound.push(dest);
        if one_shot {
            peer.disconnect_queue.push(dest);
        }
        let slots = peer.slots();
        self.outbox.event(Event::Connected {
            origin,
            dest,
            slots,
            one_shot,
        });
        self.send(origin, dest, Message::Version);

        true
    }

    /// Accept a remotely initiated connection at `dest`.
    pub fn inbound_accept(&mut self, dest: PeerId, origin: PeerId) -> bool {
        if origin == dest {
            return false;
        }
        let origin_reachable = self.is_reachable(origin);
        let Some(peer) = self.peers.get_mut(&dest) else {
            return false;
        };
        if !peer.is_reachable() || peer.slots() >= MAX_CONNECTED_PEERS || peer.is_connected(&origin)
        {
            return false;
        }
        peer.inbound.push(origin);
        if origin_reachable {
            peer.known.insert(origin, ());
        }
        true
    }

    /// Tear down the link between `origin` and `dest`.
    ///
    /// Both sides drop the other from whichever slot sequence holds it, so
    /// the call is idempotent and tolerates half-open bookkeeping.
    pub fn disconnect(&mut self, origin: PeerId, dest: PeerId, reason: DisconnectReason) {
        let mut removed = false;
        if let Some(peer) = self.peers.get_mut(&dest) {
            removed |= peer.drop_slot(&origin);
        }
        if let Some(peer) = self.peers.get_mut(&origin) {
            removed |= peer.drop_slot(&dest);
        }
        if removed {
            self.outbox.event(Event::Disconnected {
                origin,
                dest,
                reason,
            });
        }
    }

    /// Bring `id` online and bootstrap its connections, falling back to the
    /// DNS seeder when the local known table isn't enough.
    pub fn start(&mut self, id: PeerId) {
        {
            let Some(peer) = self.peers.get_mut(&id) else {
                return;
            };
            if peer.online {
                return;
            }
            peer.online = true;
        }
        self.outbox.event(Event::Started(id));
        self.set_online(id);
        self.fill_connections(id, false);

        let outbound = self
            .peers
            .get(&id)
            .map_or(0, |peer| peer.outbound.len());
        if outbound < MIN_OUTBOUND_PEERS {
            let crawler = self.seeder.crawler();
            self.connect(id, crawler, true);

            let seeded = self.query_dns();
            let fresh: Vec<PeerId> = seeded
                .into_iter()
                .filter(|peer| *peer != id && self.is_reachable(*peer))
                .take(MAX_SEED_PEERS)
                .collect();
            if let Some(peer) = self.peers.get_mut(&id) {
                for n in fresh {
                    peer.known.insert(n, ());
                }
            }
            self.fill_connections(id, false);
        }
    }

    /// Take `id` offline, draining every slot on both sides.
    pub fn stop(&mut self, id: PeerId) {
        let neighbors = {
            let Some(peer) = self.peers.get_mut(&id) else {
                return;
            };
            if !peer.online {
                return;
            }
            peer.online = false;

            // Copied before iteration: `disconnect` mutates the slots.
            let mut neighbors = peer.outbound.clone();
            neighbors.extend(peer.inbound.iter().copied());
            neighbors
        };
        self.outbox.event(Event::Stopped(id));
        self.set_offline(id);

        for n in neighbors {
            self.disconnect(id, n, DisconnectReason::Stopping);
        }
        if let Some(peer) = self.peers.get_mut(&id) {
            peer.clear_session();
        }
    }

    /// Fill outbound slots by sampling the known table, stopping once the
    /// outbound count reaches the table-bounded target. Candidates are
    /// drawn in random order and tried at most once per call; unreachable
    /// ones are evicted by `connect` as it observes them. The round bound
    /// keeps a single call cheap; the per-tick maintenance loop is the
    /// retry mechanism.
    pub fn fill_connections(&mut self, id: PeerId, one_shot: bool) {
        let mut candidates = {
            let Some(peer) = self.peers.get(&id) else {
                return;
            };
            if !peer.online {
                return;
            }
            if peer.outbound.len() >= usize::min(MAX_OUTBOUND_PEERS, peer.known.len()) {
                return;
            }
            peer.known.keys().copied().collect::<Vec<_>>()
        };
        self.rng.shuffle(&mut candidates);
        candidates.truncate(FILL_ROUNDS);

        for candidate in candidates {
            {
                let Some(peer) = self.peers.get(&id) else {
                    return;
                };
                if !peer.online {
                    return;
                }
                if peer.outbound.len() >= usize::min(MAX_OUTBOUND_PEERS, peer.known.len()) {
                    return;
                }
            }
            self.connect(id, candidate, one_shot);
        }
    }

    /// Per-tick upkeep for an online peer.
    pub fn maintenance(&mut self, id: PeerId) {
        let outbound = match self.peers.get(&id) {
            Some(peer) if peer.online => peer.outbound.clone(),
            _ => return,
        };
        // Prune neighbors that stopped answering, and forget their address.
        for n in outbound {
            if !self.is_reachable(n) {
                self.disconnect(id, n, DisconnectReason::PeerUnreachable);
                if let Some(peer) = self.peers.get_mut(&id) {
                    peer.known.remove(&n);
                }
            }
        }
        // Release one-shot slots from the previous tick.
        let queued = self
            .peers
            .get_mut(&id)
            .map(|peer| std::mem::take(&mut peer.disconnect_queue))
            .unwrap_or_default();
        for n in queued {
            self.disconnect(id, n, DisconnectReason::OneShot);
        }

        self.fill_connections(id, false);
        self.trickle(id);

        if cfg!(debug_assertions) {
            self.assert_invariants(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::id::PeerId;
    use crate::fsm::peer::{Peer, PeerKind};
    use crate::fsm::Overlay;

    /// An overlay with `count` freshly allocated reachable peers, all
    /// offline.
    fn overlay(count: usize) -> (Overlay, Vec<PeerId>) {
        let mut overlay = Overlay::new(fastrand::Rng::with_seed(42));
        let mut ids = Vec::new();
        for _ in 0..count {
            let id = overlay.peers.alloc_id(&mut overlay.rng).unwrap();
            let peer = Peer::new(id, PeerKind::Regular, true, &mut overlay.rng);
            overlay.peers.insert(peer);
            overlay.offline.push(id);
            ids.push(id);
        }
        (overlay, ids)
    }

    fn force_online(overlay: &mut Overlay, id: PeerId) {
        overlay.peers.get_mut(&id).unwrap().online = true;
        overlay.set_online(id);
    }

    #[test]
    fn test_connect_establishes_both_sides() {
        let (mut overlay, ids) = overlay(2);
        let (a, b) = (ids[0], ids[1]);
        force_online(&mut overlay, a);
        force_online(&mut overlay, b);

        assert!(overlay.connect(a, b, false));
        assert!(overlay.peers.get(&a).unwrap().outbound.contains(&b));
        assert!(overlay.peers.get(&b).unwrap().inbound.contains(&a));
    }

    #[test]
    fn test_connect_rejects_self_and_duplicates() {
        let (mut overlay, ids) = overlay(2);
        let (a, b) = (ids[0], ids[1]);
        force_online(&mut overlay, a);
        force_online(&mut overlay, b);

        assert!(!overlay.connect(a, a, false));
        assert!(overlay.connect(a, b, false));
        assert!(!overlay.connect(a, b, false));
        // The reverse direction is also an existing link.
        assert!(!overlay.connect(b, a, false));
    }

    #[test]
    fn test_connect_to_unreachable_evicts_known() {
        let (mut overlay, ids) = overlay(2);
        let (a, b) = (ids[0], ids[1]);
        force_online(&mut overlay, a);
        overlay.peers.get_mut(&a).unwrap().known.insert(b, ());

        assert!(!overlay.connect(a, b, false));
        assert!(!overlay.peers.get(&a).unwrap().known.contains(&b));
    }

    #[test]
    fn test_connect_respects_outbound_cap() {
        let (mut overlay, ids) = overlay(MAX_OUTBOUND_PEERS + 2);
        for id in &ids {
            force_online(&mut overlay, *id);
        }
        let a = ids[0];
        for dest in &ids[1..=MAX_OUTBOUND_PEERS] {
            assert!(overlay.connect(a, *dest, false));
        }
        assert!(!overlay.connect(a, ids[MAX_OUTBOUND_PEERS + 1], false));
        assert_eq!(
            overlay.peers.get(&a).unwrap().outbound.len(),
            MAX_OUTBOUND_PEERS
        );
    }

    #[test]
    fn test_inbound_accept_respects_total_cap() {
        let (mut overlay, ids) = overlay(MAX_CONNECTED_PEERS + 2);
        for id in &ids {
            force_online(&mut overlay, *id);
        }
        let target = ids[0];
        for origin in &ids[1..=MAX_CONNECTED_PEERS] {
            assert!(overlay.connect(*origin, target, false));
        }
        assert_eq!(
            overlay.peers.get(&target).unwrap().slots(),
            MAX_CONNECTED_PEERS
        );
        assert!(!overlay.connect(ids[MAX_CONNECTED_PEERS + 1], target, false));
    }

    #[test]
    fn test_inbound_accept_rejects_unreachable_destination() {
        let (mut overlay, ids) = overlay(2);
        let (a, b) = (ids[0], ids[1]);
        force_online(&mut overlay, a);
        force_online(&mut overlay, b);
        overlay.peers.get_mut(&b).unwrap().reachable = false;

        assert!(!overlay.connect(a, b, false));
        assert!(overlay.peers.get(&a).unwrap().outbound.is_empty());
    }

    #[test]
    fn test_disconnect_is_idempotent() {
        let (mut overlay, ids) = overlay(2);
        let (a, b) = (ids[0], ids[1]);
        force_online(&mut overlay, a);
        force_online(&mut overlay, b);

        assert!(overlay.connect(a, b, false));
        overlay.disconnect(a, b, DisconnectReason::Stopping);
        overlay.disconnect(a, b, DisconnectReason::Stopping);

        assert!(overlay.peers.get(&a).unwrap().outbound.is_empty());
        assert!(overlay.peers.get(&b).unwrap().inbound.is_empty());
    }

    #[test]
    fn test_stop_drains_both_sides() {
        let (mut overlay, ids) = overlay(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        for id in &ids {
            force_online(&mut overlay, *id);
        }
        assert!(overlay.connect(a, b, false));
        assert!(overlay.connect(c, a, false));

        overlay.stop(a);

        let a_peer = overlay.peers.get(&a).unwrap();
        assert!(!a_peer.online);
        assert!(a_peer.outbound.is_empty() && a_peer.inbound.is_empty());
        assert!(overlay.peers.get(&b).unwrap().inbound.is_empty());
        assert!(overlay.peers.get(&c).unwrap().outbound.is_empty());
        assert!(overlay.offline.contains(&a));
    }

    #[test]
    fn test_one_shot_releases_on_next_maintenance() {
        let (mut overlay, ids) = overlay(2);
        let (a, b) = (ids[0], ids[1]);
        force_online(&mut overlay, a);
        force_online(&mut overlay, b);

        assert!(overlay.connect(a, b, true));
        assert!(overlay.peers.get(&a).unwrap().outbound.contains(&b));

        overlay.maintenance(a);

        assert!(!overlay.peers.get(&a).unwrap().outbound.contains(&b));
        assert!(overlay.peers.get(&b).unwrap().inbound.is_empty());
    }

    #[test]
    fn test_fill_connections_reaches_known_bound() {
        let (mut overlay, ids) = overlay(4);
        for id in &ids {
            force_online(&mut overlay, *id);
        }
        let a = ids[0];
        for n in &ids[1..] {
            overlay.peers.get_mut(&a).unwrap().known.insert(*n, ());
        }
        overlay.fill_connections(a, false);

        // Known table has 3 entries, well under the outbound cap.
        assert_eq!(overlay.peers.get(&a).unwrap().outbound.len(), 3);
    }

    #[test]
    fn test_maintenance_prunes_unreachable_outbound() {
        let (mut overlay, ids) = overlay(2);
        let (a, b) = (ids[0], ids[1]);
        force_online(&mut overlay, a);
        force_online(&mut overlay, b);
        assert!(overlay.connect(a, b, false));

        overlay.stop(b);
        // `stop` already drained the pair; simulate skew by re-adding.
        overlay.peers.get_mut(&a).unwrap().outbound.push(b);
        overlay.peers.get_mut(&a).unwrap().known.insert(b, ());

        overlay.maintenance(a);

        let a_peer = overlay.peers.get(&a).unwrap();
        assert!(a_peer.outbound.is_empty());
        assert!(!a_peer.known.contains(&b));
    }

    #[test]
    fn test_lifecycle_events_are_emitted() {
        use crate::fsm::event::Event as OverlayEvent;

        let (mut overlay, ids) = overlay(2);
        let (a, b) = (ids[0], ids[1]);
        force_online(&mut overlay, a);
        force_online(&mut overlay, b);
        while overlay.outbox.next().is_some() {}

        assert!(overlay.connect(a, b, true));
        overlay.maintenance(a);
        overlay.stop(b);

        let events: Vec<OverlayEvent> = overlay.outbox.by_ref().collect();
        assert!(events.iter().any(|e| matches!(
            e,
            OverlayEvent::Peer(Event::Connected { one_shot: true, .. })
        )));
        assert!(events.iter().any(|e| matches!(
            e,
            OverlayEvent::Peer(Event::Disconnected {
                reason: DisconnectReason::OneShot,
                ..
            })
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, OverlayEvent::Peer(Event::Stopped(id)) if *id == b)));
    }

    #[test]
    fn test_start_bootstraps_through_seeder() {
        let (mut overlay, ids) = overlay(3);
        let (a, b, c) = (ids[0], ids[1], ids[2]);
        force_online(&mut overlay, b);
        force_online(&mut overlay, c);

        // Let the crawler see the online peers, then rebuild the cache.
        overlay.crawler_maintenance();
        overlay.cache_hit(true);
        assert!(!overlay.seeder.cache().is_empty());

        overlay.start(a);

        let a_peer = overlay.peers.get(&a).unwrap();
        assert!(a_peer.online);
        assert!(!a_peer.outbound.is_empty());
    }
}
