//! The DNS seeder: a cached sample of the crawler's good set.
use std::fmt;

use crate::common::id::PeerId;
use crate::common::time::Tick;
use crate::fsm::Overlay;

/// Hard cap on entries in the seeder cache.
const MAX_CACHE_SIZE: usize = 1000;
/// Maximum number of cached peers a booting node absorbs.
pub const MAX_SEED_PEERS: usize = 20;
/// Minimum cache age, in ticks, before hit pressure alone forces a rebuild.
const MIN_CACHE_AGE: u64 = 5;

/// A seeder event.
#[derive(Debug, Clone)]
pub enum Event {
    /// The cache was re-sampled from the crawler's good set.
    CacheRebuilt {
        /// Entries now in the cache.
        size: usize,
        /// Good nodes available at rebuild time.
        good: usize,
    },
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CacheRebuilt { size, good } => {
                write!(f, "seeder cache rebuilt: {} of {} good node(s)", size, good)
            }
        }
    }
}

/// The bootstrap oracle.
///
/// Serves a cached sample of recently seen reachable peers and re-samples
/// the cache under the hit-pressure policy of `cache_hit`, so small caches
/// refresh often while large ones settle.
#[derive(Debug)]
pub struct Seeder {
    crawler: PeerId,
    cache: Vec<PeerId>,
    cache_built_at: Tick,
    hits: u64,
}

impl Seeder {
    pub fn new(crawler: PeerId) -> Self {
        Self {
            crawler,
            cache: Vec::new(),
            cache_built_at: Tick::default(),
            hits: 0,
        }
    }

    /// The crawler backing this seeder.
    pub fn crawler(&self) -> PeerId {
        self.crawler
    }

    /// The currently served cache.
    pub fn cache(&self) -> &[PeerId] {
        &self.cache
    }

    /// Queries answered since the cache was last rebuilt.
    pub fn hits(&self) -> u64 {
        self.hits
    }
}

impl Overlay {
    /// Answer a DNS query: count the hit, rebuild if due, serve the cache.
    pub fn query_dns(&mut self) -> Vec<PeerId> {
        self.cache_hit(false);
        self.seeder.cache.clone()
    }

    /// Count a cache hit and rebuild when the policy says so.
    ///
    /// The quadratic hit term dominates for small caches, rebuilding them
    /// eagerly; the second term lets sustained pressure refresh a cache
    /// that has aged past [`MIN_CACHE_AGE`].
    pub fn cache_hit(&mut self, force: bool) {
        self.seeder.hits += 1;

        let hits = self.seeder.hits;
        let size = self.seeder.cache.len() as u64;
        let age = self.clock - self.seeder.cache_built_at;

        if force
            || hits > size * size / 400
            || (hits * hits > size / 20 && age > MIN_CACHE_AGE)
        {
            self.rebuild_cache();
        }
    }

    fn rebuild_cache(&mut self) {
        self.seeder.cache.clear();
        self.seeder.hits = 0;
        self.seeder.cache_built_at = self.clock;

        // The good set is as old as the last crawl; entries that stopped
        // since then must not be served.
        let good: Vec<PeerId> = self
            .peers
            .get(&self.seeder.crawler)
            .map(|peer| {
                peer.good_nodes()
                    .iter()
                    .copied()
                    .filter(|n| self.peers.is_reachable(*n))
                    .collect()
            })
            .unwrap_or_default();
        if good.is_empty() {
            return;
        }
        let count = usize::min((good.len() + 1) / 2, MAX_CACHE_SIZE);
        for _ in 0..count {
            let ix = self.rng.usize(..good.len());
            self.seeder.cache.push(good[ix]);
        }
        self.outbox.event(Event::CacheRebuilt {
            size: count,
            good: good.len(),
        });
    }
}
