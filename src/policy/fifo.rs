//! First-In First-Out simulation cache.
//!
//! Same layout as the LRU cache, but a hit does not touch the queue: objects
//! are evicted strictly in insertion order.

use hashbrown::HashMap;

use crate::policy::list::{EvictList, SlotData};
use crate::policy::{CacheStats, PolicyConfig};
use crate::request::Request;

/// FIFO cache simulated at byte granularity.
#[derive(Debug)]
pub struct FifoCache {
    config: PolicyConfig,
    list: EvictList,
    map: HashMap<u64, u32>,
    occupied: u64,
    stats: CacheStats,
}

impl FifoCache {
    /// Empty cache with the given byte budget.
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            list: EvictList::new(),
            map: HashMap::new(),
            occupied: 0,
            stats: CacheStats::default(),
        }
    }

    /// Number of cached objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Bytes currently charged against the budget.
    #[inline]
    pub fn occupied_bytes(&self) -> u64 {
        self.occupied
    }

    /// Hit/miss counters accumulated so far.
    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Process one request: true on hit.
    pub fn get(&mut self, req: &Request) -> bool {
        let hit = if self.map.contains_key(&req.obj_id) {
            true
        } else {
            self.insert(req);
            false
        };
        self.stats.record(req.obj_size, hit);
        hit
    }

    fn insert(&mut self, req: &Request) {
        let need = req.obj_size + self.config.per_obj_overhead;
        if need > self.config.cache_size {
            return;
        }
        while self.occupied + need > self.config.cache_size {
            let Some(victim) = self.list.pop_back() else {
                break;
            };
            self.map.remove(&victim.obj_id);
            self.occupied -= victim.size;
        }
        let slot = self.list.push_front(SlotData {
            obj_id: req.obj_id,
            size: need,
        });
        self.map.insert(req.obj_id, slot);
        self.occupied += need;
    }
}
