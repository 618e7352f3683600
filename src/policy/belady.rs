//! Online Belady (OPT) lower-bound policy.
//!
//! Computes, in a single forward pass, whether each request *would* have hit
//! under the offline-optimal policy. A lazy segment tree over virtual time
//! records the occupancy of every retained interval: an object last seen at
//! `t_prev` can be kept through the current time `t` iff the peak occupancy
//! over `[t_prev, t]` plus its size still fits the budget. Objects that are
//! never re-referenced are never charged, which is exactly Belady: caching
//! them has zero benefit, so OPT would not have kept them.
//!
//! No eviction decision is ever committed retroactively; the tree only ever
//! accumulates admitted intervals.

use hashbrown::HashMap;

use crate::policy::{CacheStats, PolicyConfig};
use crate::request::Request;
use crate::segtree::LazySegmentTree;

/// Offline-optimal hit-count lower bound, evaluated online.
#[derive(Debug)]
pub struct BeladyOnline {
    config: PolicyConfig,
    tree: LazySegmentTree,
    last_access: HashMap<u64, u64>,
    vtime: u64,
    stats: CacheStats,
}

impl BeladyOnline {
    /// Empty tracker with the given byte budget.
    pub fn new(config: PolicyConfig) -> Self {
        Self {
            config,
            tree: LazySegmentTree::new(),
            last_access: HashMap::new(),
            vtime: 0,
            stats: CacheStats::default(),
        }
    }

    /// Hit/miss counters accumulated so far.
    #[inline]
    pub fn stats(&self) -> &CacheStats {
        &self.stats
    }

    /// Peak occupancy over `[from, to]` in virtual time.
    pub fn occupancy(&mut self, from: u64, to: u64) -> i64 {
        self.tree.query(from as usize, to as usize)
    }

    /// Process one request: true if OPT would have served it from cache.
    pub fn get(&mut self, req: &Request) -> bool {
        let mut hit = false;
        let need = (req.obj_size + self.config.per_obj_overhead) as i64;
        if let Some(&prev) = self.last_access.get(&req.obj_id) {
            let occ = self.tree.query(prev as usize, self.vtime as usize);
            if occ + need <= self.config.cache_size as i64 {
                self.tree.update(prev as usize, self.vtime as usize, need);
                hit = true;
            }
        }
        self.last_access.insert(req.obj_id, self.vtime);
        self.vtime += 1;
        self.stats.record(req.obj_size, hit);
        hit
    }
}
