//! The simulation driver: boot schedule, churn, and the tick loop.
use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};

use crate::common::collections::RandomState;
use crate::common::id::PeerId;
use crate::common::time::Tick;
use crate::fsm::crawler::CRAWLER_INTERVAL;
use crate::fsm::peer::{Peer, PeerKind};
use crate::fsm::Overlay;

/// Ticks between churn pulses.
pub const CHURN_INTERVAL: u64 = 100;

/// Simulation parameters.
#[derive(Debug, Clone)]
pub struct Config {
    /// Reachable peers to spawn.
    pub servers: u32,
    /// Unreachable peers to spawn.
    pub clients: u32,
    /// Simulation horizon, in ticks.
    pub duration: u64,
    /// Upper bound on peers stopped and started per churn pulse. Zero
    /// disables churn.
    pub churn: u32,
}

/// The final topology handed to the analytics collaborator.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Online peers at the horizon. The crawler is not part of the
    /// topology.
    pub vertices: Vec<PeerId>,
    /// Undirected, deduplicated connection pairs.
    pub edges: Vec<(PeerId, PeerId)>,
}

/// A tick-driven simulation of the overlay.
///
/// Owns the overlay and advances it until the horizon: booting scheduled
/// peers, running per-tick maintenance, and applying periodic churn and
/// crawler pulses.
#[derive(Debug)]
pub struct Simulation {
    pub overlay: Overlay,
    config: Config,
    boot_schedule: HashMap<u64, Vec<PeerId>, RandomState>,
    end: Tick,
}

impl Simulation {
    /// Allocate every peer and draw its boot tick uniformly over the
    /// horizon.
    pub fn new(config: Config, rng: fastrand::Rng) -> Self {
        let mut overlay = Overlay::new(rng);
        let mut boot_schedule: HashMap<u64, Vec<PeerId>, RandomState> =
            HashMap::with_hasher(RandomState::from(overlay.rng.fork()));

        let total = config.servers as usize + config.clients as usize;
        for i in 0..total {
            let reachable = i < config.servers as usize;
            let Some(id) = overlay.peers.alloc_id(&mut overlay.rng) else {
                // Allocation failure drops the peer; the run continues.
                continue;
            };
            let peer = Peer::new(id, PeerKind::Regular, reachable, &mut overlay.rng);
            overlay.peers.insert(peer);
            overlay.offline.push(id);

            let boot = if config.duration > 0 {
                overlay.rng.u64(..config.duration)
            } else {
                0
            };
            debug!(
                target: "sim",
                "created {} node {}, booting at tick {}",
                if reachable { "server" } else { "client" },
                id,
                boot
            );
            boot_schedule.entry(boot).or_default().push(id);
        }

        let end = Tick::from_u64(config.duration);
        Self {
            overlay,
            config,
            boot_schedule,
            end,
        }
    }

    /// Run the simulation to its horizon and export the topology.
    pub fn run(&mut self) -> Snapshot {
        let mut churn_counter = 0u64;
        let mut crawler_counter = 0u64;

        while self.overlay.clock < self.end {
            churn_counter += 1;
            crawler_counter += 1;

            self.tick();

            if churn_counter == CHURN_INTERVAL {
                if self.config.churn > 0 {
                    self.churn_pulse();
                }
                churn_counter = 0;
            }
            if crawler_counter == CRAWLER_INTERVAL {
                self.overlay.crawler_maintenance();
                crawler_counter = 0;
            }

            while let Some(event) = self.overlay.outbox.next() {
                debug!(target: "sim", "{:>10}: {}", self.overlay.clock, event);
            }
            self.overlay.clock.advance();
        }

        for id in &self.overlay.online {
            let Some(peer) = self.overlay.peers.get(id) else {
                continue;
            };
            if !peer.is_crawler() && peer.slots() == 0 {
                warn!(target: "sim", "{} has no connections", id);
            }
        }
        self.snapshot()
    }

    /// One tick: boots, then maintenance over a snapshot of the online set.
    fn tick(&mut self) {
        let now = self.overlay.clock.as_u64();
        if let Some(boots) = self.boot_schedule.remove(&now) {
            for id in boots {
                self.overlay.start(id);
            }
        }

        let online: Vec<PeerId> = self.overlay.online.clone();
        let crawler = self.overlay.seeder.crawler();
        for id in online {
            // The crawler is maintained by its own pulse, not per tick.
            if id == crawler {
                continue;
            }
            self.overlay.maintenance(id);
        }
    }

    /// Stop and start a bounded random number of peers. The crawler is
    /// never stopped.
    fn churn_pulse(&mut self) {
        let crawler = self.overlay.seeder.crawler();

        let stops = self.overlay.rng.u32(..self.config.churn);
        for _ in 0..stops {
            if self.overlay.online.is_empty() {
                break;
            }
            let ix = self.overlay.rng.usize(..self.overlay.online.len());
            let id = self.overlay.online[ix];
            if id == crawler {
                continue;
            }
            self.overlay.stop(id);
        }

        let starts = self.overlay.rng.u32(..self.config.churn);
        for _ in 0..starts {
            if self.overlay.offline.is_empty() {
                break;
            }
            let ix = self.overlay.rng.usize(..self.overlay.offline.len());
            let id = self.overlay.offline[ix];
            self.overlay.start(id);
        }
        info!(
            target: "sim",
            "churn pulse at {}: {} stopped, {} started, {} online",
            self.overlay.clock,
            stops,
            starts,
            self.overlay.online.len()
        );
    }

    /// Export the live topology: online peers and their deduplicated
    /// undirected connections, with the crawler and its probes left out.
    pub fn snapshot(&self) -> Snapshot {
        let crawler = self.overlay.seeder.crawler();
        let vertices: Vec<PeerId> = self
            .overlay
            .online
            .iter()
            .copied()
            .filter(|id| *id != crawler)
            .collect();
        let members: HashSet<PeerId, RandomState> = vertices.iter().copied().collect();

        let mut seen: HashSet<(PeerId, PeerId), RandomState> = HashSet::default();
        let mut edges = Vec::new();
        for id in &vertices {
            let Some(peer) = self.overlay.peers.get(id) else {
                continue;
            };
            for n in &peer.outbound {
                if !members.contains(n) {
                    continue;
                }
                let key = if id < n { (*id, *n) } else { (*n, *id) };
                if seen.insert(key) {
                    edges.push(key);
                }
            }
        }
        Snapshot { vertices, edges }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }
}
