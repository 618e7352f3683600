//! MINISIM: spatially-sampled multi-size parallel simulation.
//!
//! Instead of estimating reuse distances, MINISIM runs the actual eviction
//! policy. The trace is spatially sampled at rate `R`; one downscaled cache
//! (`size * R`) is built per profiled size and all of them replay the
//! sampled stream, in parallel across a bounded worker pool. Scaling the
//! observed miss counters by `1/R` recovers an estimate for the full trace:
//! `hits = n_req - misses / R`, clipped to the trace totals.
//!
//! Rates above 0.5 buy little and distort the downscaled caches, so they
//! disable sampling altogether (with a warning); the run then simulates the
//! raw trace against the unscaled sizes.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::policy::{simulate_multi, PolicyCache, PolicyConfig};
use crate::profiler::{MinisimParams, MrcCurve};
use crate::request::{Request, SpatialSampler, TraceReader};
use crate::sizes::SizeVector;

/// Multi-size simulation profiler for any supported policy.
#[derive(Debug, Clone)]
pub struct MinisimProfiler {
    params: MinisimParams,
    algo: String,
    sizes: SizeVector,
}

impl MinisimProfiler {
    pub(crate) fn new(params: MinisimParams, algo: &str, sizes: SizeVector) -> Self {
        Self {
            params,
            algo: algo.to_string(),
            sizes,
        }
    }

    /// Consume the trace twice (count, then simulate) and produce the curve.
    pub fn run(&mut self, reader: &mut dyn TraceReader) -> Result<MrcCurve> {
        let mut curve = MrcCurve::new(&self.sizes);

        let sampler = if self.params.rate > 0.5 {
            warn!(
                rate = self.params.rate,
                "sampling rate above 0.5, simulating the raw trace"
            );
            None
        } else {
            Some(SpatialSampler::new(self.params.rate, self.params.seed)?)
        };

        // pass 1: raw totals and the sampled share
        let mut sampled_cnt: u64 = 0;
        let mut sampled_size: u64 = 0;
        while let Some(req) = reader.read_next()? {
            if req.obj_size == 0 {
                return Err(Error::Internal(format!(
                    "zero-size object {} in trace",
                    req.obj_id
                )));
            }
            curve.n_req += 1;
            curve.sum_obj_size_req += req.obj_size;
            if sampler.as_ref().map_or(true, |s| s.sample(req.obj_id)) {
                sampled_cnt += 1;
                sampled_size += req.obj_size;
            }
        }
        debug!(
            n_req = curve.n_req,
            sum_obj_size_req = curve.sum_obj_size_req,
            sampled_cnt,
            sampled_size,
            "first pass complete"
        );

        // pass 2: rewind, install the sampler, materialize the sampled stream
        reader.reset()?;
        let effective_rate = match &sampler {
            Some(s) => {
                reader.install_spatial_sampler(s.clone());
                s.rate()
            }
            None => 1.0,
        };
        let mut sampled: Vec<Request> = Vec::with_capacity(sampled_cnt as usize);
        while let Some(req) = reader.read_next()? {
            sampled.push(req);
        }

        // one downscaled cache per profiled size
        let mut caches = Vec::with_capacity(self.sizes.len());
        for &size in &self.sizes.sizes {
            let scaled = (size as f64 * effective_rate) as u64;
            caches.push(PolicyCache::create(&self.algo, PolicyConfig::new(scaled))?);
        }
        let stats = simulate_multi(&sampled, caches, self.params.threads)?;

        // scale the miss counters back to the full trace
        let inv = 1.0 / effective_rate;
        for (i, st) in stats.iter().enumerate() {
            let hits = curve.n_req as f64 - st.n_miss as f64 * inv;
            let hit_bytes = curve.sum_obj_size_req as f64 - st.n_miss_byte as f64 * inv;
            curve.hit_count[i] = hits.clamp(0.0, curve.n_req as f64);
            curve.hit_bytes[i] = hit_bytes.clamp(0.0, curve.sum_obj_size_req as f64);
        }
        Ok(curve)
    }
}
