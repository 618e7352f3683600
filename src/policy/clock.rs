//! CLOCK (second-chance) simulation cache.
//!
//! FIFO queue with one reference bit per object. A hit sets the bit; when an
//! eviction candidate surfaces with its bit set, the bit is cleared and the
//! object goes back to the warm end instead of being evicted. Every sweep
//! step either evicts or clears a bit, so eviction terminates.

use hashbrown::HashMap;

use crate::policy::list::{EvictList, SlotData};
use crate::policy::{CacheStats, PolicyConfig};
use crate::request::Request;

#[derive(Debug, Clone, Copy)]
struct ClockEntry {
    slot: u32,
    referenced: bool,
}

/// CLOCK cache simulated at byte granularity.
#[derive(Debug)]
pub struct ClockCache {
    config: PolicyConfig,
    list: EvictList,
    map: HashMap<u64, ClockEntry>,
    occupied: u64,
    stats: CacheStats,
}

impl ClockCache {
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
        let hit = if let Some(entry) = self.map.get_mut(&req.obj_id) {
            entry.referenced = true;
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
            let Some(candidate) = self.list.pop_back() else {
                break;
            };
            match self.map.get_mut(&candidate.obj_id) {
                Some(entry) if entry.referenced => {
                    // second chance: clear the bit and recycle to the warm end
                    entry.referenced = false;
                    entry.slot = self.list.push_front(candidate);
                }
                _ => {
                    self.map.remove(&candidate.obj_id);
                    self.occupied -= candidate.size;
                }
            }
        }
        let slot = self.list.push_front(SlotData {
            obj_id: req.obj_id,
            size: need,
        });
        self.map.insert(
            req.obj_id,
            ClockEntry {
                slot,
                referenced: false,
            },
        );
        self.occupied += need;
    }
}
