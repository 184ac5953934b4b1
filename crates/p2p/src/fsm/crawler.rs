//! The seeder's crawler: one-shot probing and good-set tracking.
use tracing::trace;

use crate::common::id::PeerId;
use crate::fsm::peer::PeerKind;
use crate::fsm::peermgr::DisconnectReason;
use crate::fsm::Overlay;

/// Ticks between crawler maintenance runs.
pub const CRAWLER_INTERVAL: u64 = 100;

impl Overlay {
    /// Crawler upkeep, run every [`CRAWLER_INTERVAL`] ticks by the driver.
    ///
    /// Refreshes the good set from the online population, then performs the
    /// regular sweep with every connection forced one-shot, so the crawler
    /// keeps probing without ever holding persistent slots.
    pub fn crawler_maintenance(&mut self) {
        let id = self.seeder.crawler();

        let good: Vec<PeerId> = self
            .online
            .iter()
            .copied()
            .filter(|n| *n != id && self.peers.is_reachable(*n))
            .collect();
        trace!(target: "p2p", "{}: crawler sees {} good node(s)", id, good.len());
        if let Some(peer) = self.peers.get_mut(&id) {
            if let PeerKind::Crawler { good_nodes } = &mut peer.kind {
                *good_nodes = good;
            }
        }

        let outbound = match self.peers.get(&id) {
            Some(peer) if peer.online => peer.outbound.clone(),
            _ => return,
        };
        for n in outbound {
            if !self.is_reachable(n) {
                self.disconnect(id, n, DisconnectReason::PeerUnreachable);
                if let Some(peer) = self.peers.get_mut(&id) {
                    peer.known.remove(&n);
                }
            }
        }
        let queued = self
            .peers
            .get_mut(&id)
            .map(|peer| std::mem::take(&mut peer.disconnect_queue))
            .unwrap_or_default();
        for n in queued {
            self.disconnect(id, n, DisconnectReason::OneShot);
        }

        self.fill_connections(id, true);

        if cfg!(debug_assertions) {
            self.assert_invariants(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::peer::Peer;

    fn overlay_with_servers(count: usize) -> (Overlay, Vec<PeerId>) {
        let mut overlay = Overlay::new(fastrand::Rng::with_seed(23));
        let mut ids = Vec::new();
        for _ in 0..count {
            let id = overlay.peers.alloc_id(&mut overlay.rng).unwrap();
            let mut peer = Peer::new(id, PeerKind::Regular, true, &mut overlay.rng);
            peer.online = true;
            overlay.peers.insert(peer);
            overlay.set_online(id);
            ids.push(id);
        }
        (overlay, ids)
    }

    #[test]
    fn test_good_set_tracks_reachable_online_peers() {
        let (mut overlay, ids) = overlay_with_servers(3);
        let crawler = overlay.seeder.crawler();

        overlay.crawler_maintenance();
        let good = overlay.peers.get(&crawler).unwrap().good_nodes().to_vec();
        assert_eq!(good, ids);

        overlay.stop(ids[0]);
        overlay.crawler_maintenance();
        let good = overlay.peers.get(&crawler).unwrap().good_nodes().to_vec();
        assert_eq!(good, ids[1..].to_vec());
    }

    #[test]
    fn test_good_set_excludes_the_crawler_itself() {
        let (mut overlay, _) = overlay_with_servers(1);
        let crawler = overlay.seeder.crawler();

        overlay.crawler_maintenance();
        assert!(!overlay
            .peers
            .get(&crawler)
            .unwrap()
            .good_nodes()
            .contains(&crawler));
    }

    #[test]
    fn test_crawler_connections_are_released_next_sweep() {
        let (mut overlay, ids) = overlay_with_servers(4);
        let crawler = overlay.seeder.crawler();
        for n in &ids {
            overlay
                .peers
                .get_mut(&crawler)
                .unwrap()
                .known
                .insert(*n, ());
        }

        overlay.crawler_maintenance();
        let held = overlay.peers.get(&crawler).unwrap().outbound.len();
        assert!(held > 0, "the sweep should have probed known peers");

        overlay.crawler_maintenance();
        // The previous sweep's one-shot slots were queued and are now
        // drained before new probes are made.
        for n in &ids {
            let peer = overlay.peers.get(n).unwrap();
            assert!(peer.inbound.len() <= 1);
        }
    }
}
