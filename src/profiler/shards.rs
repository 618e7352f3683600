//! SHARDS: single-pass miss-ratio curves for LRU via spatial sampling.
//!
//! Every request is hashed with a seeded 64-bit hash of its object id; a
//! request is sampled iff the hash clears a rate-derived threshold, so all
//! accesses of an object share one fate. For each sampled reuse, the
//! byte-weighted stack distance comes from one reuse-tree query, is scaled
//! by the reciprocal sampling rate, and lands in the smallest profiled size
//! that covers it. Prefix sums then turn the per-bucket histogram into
//! cumulative hit counters, after a compulsory-miss correction absorbs the
//! difference between the scaled sampled stream and the raw totals.
//!
//! Fixed-rate mode uses one constant rate. Fixed-size mode bounds the
//! tracked objects by a capacity `T`: a bounded min-map keeps the `T`
//! smallest object hashes, the effective rate decays to
//! `max_score / u64::MAX` as the map fills, and evicted objects leave the
//! reuse tree and the last-access map atomically. The rate is evaluated
//! after the map mutation, and admission uses a strict compare against the
//! max score.
//!
//! Repeat accesses of a tracked object are scaled by the rate in effect
//! *now*, not the rate when the object was first tracked; the resulting
//! small bias is accepted behavior.

use hashbrown::HashMap;

use crate::error::{Error, Result};
use crate::minmap::MinValueMap;
use crate::profiler::{MrcCurve, ShardsMode, ShardsParams};
use crate::request::{rate_threshold, SeededHasher, TraceReader};
use crate::reuse_tree::ReuseTree;
use crate::sizes::SizeVector;

/// Single-pass LRU miss-ratio-curve estimator.
#[derive(Debug)]
pub struct ShardsProfiler {
    params: ShardsParams,
    sizes: SizeVector,
}

/// Reuse-distance bookkeeping shared by both sampling modes: the reuse tree
/// and the last-access map are only ever updated together.
#[derive(Debug)]
struct ReuseState {
    tree: ReuseTree,
    last_access: HashMap<u64, u64>,
    vtime: u64,
    sampled_cnt: f64,
    sampled_size: f64,
    hit_cnt: Vec<f64>,
    hit_size: Vec<f64>,
}

impl ReuseState {
    fn new(points: usize) -> Self {
        Self {
            tree: ReuseTree::new(),
            last_access: HashMap::new(),
            vtime: 0,
            sampled_cnt: 0.0,
            sampled_size: 0.0,
            hit_cnt: vec![0.0; points],
            hit_size: vec![0.0; points],
        }
    }

    #[inline]
    fn tracks(&self, obj_id: u64) -> bool {
        self.last_access.contains_key(&obj_id)
    }

    /// Account one sampled request at the current vtime under `rate`.
    fn admit(&mut self, obj_id: u64, obj_size: u64, rate: f64, sizes: &SizeVector) {
        self.sampled_cnt += 1.0 / rate;
        self.sampled_size += obj_size as f64 / rate;
        if let Some(prev) = self.last_access.insert(obj_id, self.vtime) {
            let distance = (self.tree.distance(prev) as f64 / rate) as u64;
            self.tree.erase(prev);
            self.tree.insert(self.vtime, obj_size);
            if let Some(idx) = sizes.first_fit(distance) {
                self.hit_cnt[idx] += 1.0 / rate;
                self.hit_size[idx] += obj_size as f64 / rate;
            }
        } else {
            self.tree.insert(self.vtime, obj_size);
        }
    }

    /// Drop a no-longer-sampled object from both structures.
    fn forget(&mut self, obj_id: u64) {
        if let Some(prev) = self.last_access.remove(&obj_id) {
            self.tree.erase(prev);
        }
    }

    /// Compulsory-miss correction plus prefix sums into the curve.
    fn finalize(mut self, curve: &mut MrcCurve) {
        if let Some(first) = self.hit_cnt.first_mut() {
            *first += curve.n_req as f64 - self.sampled_cnt;
        }
        if let Some(first) = self.hit_size.first_mut() {
            *first += curve.sum_obj_size_req as f64 - self.sampled_size;
        }
        let mut accu_cnt = 0.0;
        let mut accu_size = 0.0;
        for i in 0..self.hit_cnt.len() {
            accu_cnt += self.hit_cnt[i];
            accu_size += self.hit_size[i];
            curve.hit_count[i] = accu_cnt;
            curve.hit_bytes[i] = accu_size;
        }
    }
}

impl ShardsProfiler {
    pub(crate) fn new(params: ShardsParams, sizes: SizeVector) -> Self {
        Self { params, sizes }
    }

    /// Consume the trace and produce the curve.
    pub fn run(&mut self, reader: &mut dyn TraceReader) -> Result<MrcCurve> {
        match self.params.mode {
            ShardsMode::FixedRate(rate) => self.fixed_rate_run(reader, rate),
            ShardsMode::FixedSize(capacity) => self.fixed_size_run(reader, capacity),
        }
    }

    fn fixed_rate_run(&self, reader: &mut dyn TraceReader, rate: f64) -> Result<MrcCurve> {
        let hasher = SeededHasher::new(self.params.seed);
        let sample_max = rate_threshold(rate);
        let mut curve = MrcCurve::new(&self.sizes);
        let mut state = ReuseState::new(self.sizes.len());

        while let Some(req) = reader.read_next()? {
            check_obj_size(req.obj_id, req.obj_size)?;
            curve.n_req += 1;
            curve.sum_obj_size_req += req.obj_size;
            state.vtime += 1;
            if hasher.hash(req.obj_id) <= sample_max {
                state.admit(req.obj_id, req.obj_size, rate, &self.sizes);
            }
        }

        state.finalize(&mut curve);
        Ok(curve)
    }

    fn fixed_size_run(&self, reader: &mut dyn TraceReader, capacity: usize) -> Result<MrcCurve> {
        let hasher = SeededHasher::new(self.params.seed);
        let mut minmap = MinValueMap::new(capacity);
        let mut curve = MrcCurve::new(&self.sizes);
        let mut state = ReuseState::new(self.sizes.len());

        while let Some(req) = reader.read_next()? {
            check_obj_size(req.obj_id, req.obj_size)?;
            curve.n_req += 1;
            curve.sum_obj_size_req += req.obj_size;
            state.vtime += 1;

            let hash = hasher.hash(req.obj_id);
            let tracked = state.tracks(req.obj_id);
            let admitted =
                tracked || !minmap.full() || hash < minmap.max_score().unwrap_or(u64::MAX);
            if !admitted {
                continue;
            }
            if !tracked {
                if let Some(evicted) = minmap.insert(req.obj_id, hash) {
                    state.forget(evicted);
                }
            }
            // the effective rate reflects the map *after* this mutation
            let rate = if minmap.full() {
                minmap.max_score().unwrap_or(u64::MAX) as f64 / u64::MAX as f64
            } else {
                1.0
            };
            state.admit(req.obj_id, req.obj_size, rate, &self.sizes);
        }

        state.finalize(&mut curve);
        Ok(curve)
    }
}

#[inline]
fn check_obj_size(obj_id: u64, obj_size: u64) -> Result<()> {
    if obj_size == 0 {
        return Err(Error::Internal(format!(
            "zero-size object {obj_id} in trace"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::Profiler;
    use crate::request::{MemoryReader, Request};

    fn unit_sizes(sizes: &[u64]) -> SizeVector {
        SizeVector {
            sizes: sizes.to_vec(),
            wss_ratios: None,
        }
    }

    fn run_shards(params: &str, ids: &[u64], sizes: &[u64]) -> MrcCurve {
        let params: ShardsParams = params.parse().unwrap();
        let mut profiler =
            Profiler::shards(params, "lru", unit_sizes(sizes)).unwrap();
        let mut reader = MemoryReader::from_ids(ids);
        profiler.run(&mut reader).unwrap()
    }

    #[test]
    fn cyclic_trace_exact_at_full_rate() {
        // 1,2,3 repeated: every reuse has stack distance 3
        let curve = run_shards("FIX_RATE,1.0,42", &[1, 2, 3, 1, 2, 3, 1, 2, 3], &[1, 2, 3, 4]);
        assert_eq!(curve.n_req, 9);
        assert_eq!(curve.hit_count, vec![0.0, 0.0, 6.0, 6.0]);
        assert_eq!(curve.hit_bytes, vec![0.0, 0.0, 6.0, 6.0]);
        assert_eq!(curve.miss_rate(0), 1.0);
        assert_eq!(curve.miss_rate(1), 1.0);
        assert!((curve.miss_rate(2) - 1.0 / 3.0).abs() < 1e-12);
        assert!((curve.miss_rate(3) - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn no_reuse_means_all_misses() {
        let curve = run_shards("FIX_RATE,1.0,42", &[1, 2, 3, 4, 5], &[1, 5]);
        assert_eq!(curve.miss_rate(0), 1.0);
        assert_eq!(curve.miss_rate(1), 1.0);
        assert_eq!(curve.byte_miss_rate(1), 1.0);
    }

    #[test]
    fn weighted_distances_respect_object_sizes() {
        // objects of size 10; reuse of 1 spans {1,2} = 20 weighted bytes
        let trace = vec![
            Request::new(1, 1, 10),
            Request::new(2, 2, 10),
            Request::new(3, 1, 10),
        ];
        let params: ShardsParams = "FIX_RATE,1,0".parse().unwrap();
        let mut profiler =
            Profiler::shards(params, "LRU", unit_sizes(&[10, 20, 40])).unwrap();
        let mut reader = MemoryReader::new(trace);
        let curve = profiler.run(&mut reader).unwrap();
        // distance 20 lands in the 20-byte bucket
        assert_eq!(curve.hit_count, vec![0.0, 1.0, 1.0]);
        assert_eq!(curve.hit_bytes, vec![0.0, 10.0, 10.0]);
    }

    #[test]
    fn monotone_curve_on_skewed_trace() {
        let ids: Vec<u64> = (0..20_000u64).map(|i| (i * i + i / 3) % 501).collect();
        for params in ["FIX_RATE,1.0,1", "FIX_RATE,0.25,1", "FIX_SIZE,64,1"] {
            let curve = run_shards(params, &ids, &[8, 32, 128, 501]);
            for i in 1..curve.len() {
                assert!(
                    curve.hit_count[i] >= curve.hit_count[i - 1],
                    "{params}: hit_count not monotone at {i}"
                );
                assert!(curve.hit_bytes[i] >= curve.hit_bytes[i - 1]);
                assert!(curve.miss_rate(i) <= curve.miss_rate(i - 1));
            }
        }
    }

    #[test]
    fn sampled_rate_approximates_full_rate() {
        // zipf-ish synthetic trace, unit sizes
        let mut x = 88172645463325252u64;
        let mut ids = Vec::with_capacity(200_000);
        for _ in 0..200_000 {
            // xorshift64
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            let r = (x >> 11) as f64 / (1u64 << 53) as f64;
            // quadratic skew over 2000 objects
            ids.push((r * r * 2000.0) as u64);
        }
        let sizes = [50, 200, 800, 2000];
        let exact = run_shards("FIX_RATE,1.0,42", &ids, &sizes);
        let sampled = run_shards("FIX_RATE,0.1,42", &ids, &sizes);
        for i in 0..sizes.len() {
            let delta = (exact.miss_rate(i) - sampled.miss_rate(i)).abs();
            assert!(delta < 0.05, "point {i}: delta {delta}");
        }
    }

    #[test]
    fn fixed_size_tracks_at_most_capacity_objects() {
        let ids: Vec<u64> = (0..5000u64).map(|i| i % 1000).collect();
        let params: ShardsParams = "FIX_SIZE,32,7".parse().unwrap();
        let profiler = ShardsProfiler::new(params, unit_sizes(&[10, 100, 1000]));
        // internal state is exercised through run(); the curve must stay sane
        let mut profiler = Profiler::Shards(profiler);
        let mut reader = MemoryReader::from_ids(&ids);
        let curve = profiler.run(&mut reader).unwrap();
        assert_eq!(curve.n_req, 5000);
        for i in 0..curve.len() {
            let rate = curve.miss_rate(i);
            assert!((0.0..=1.0).contains(&rate));
        }
    }

    #[test]
    fn zero_size_object_is_an_internal_error() {
        let trace = vec![Request::new(1, 1, 1), Request::new(2, 2, 0)];
        let params: ShardsParams = "FIX_RATE,1,0".parse().unwrap();
        let mut profiler = Profiler::shards(params, "lru", unit_sizes(&[1])).unwrap();
        let mut reader = MemoryReader::new(trace);
        assert!(matches!(
            profiler.run(&mut reader),
            Err(Error::Internal(_))
        ));
    }
}
