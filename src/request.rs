//! Trace requests, the reader abstraction, and spatial sampling.
//!
//! A trace is a finite, totally ordered stream of [`Request`] records. The
//! profilers consume it through the [`TraceReader`] trait so that file-backed
//! readers, in-memory traces, and test fixtures are interchangeable.
//!
//! Spatial sampling admits a request iff a deterministic hash of its object
//! id falls under a rate-derived threshold, so the same objects are selected
//! on every pass over the trace for a given seed.

use core::fmt;
use core::hash::BuildHasher;

use hashbrown::HashMap;

use crate::error::{Error, Result};

/// A single trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request {
    /// Trace timestamp (opaque to the profilers; readers preserve it).
    pub time: u64,
    /// Object identifier.
    pub obj_id: u64,
    /// Object size in bytes.
    pub obj_size: u64,
}

impl Request {
    /// Create a new request record.
    pub fn new(time: u64, obj_id: u64, obj_size: u64) -> Self {
        Self {
            time,
            obj_id,
            obj_size,
        }
    }
}

/// Working-set summary of a trace: distinct objects and their total bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingSet {
    /// Number of distinct object ids.
    pub n_obj: u64,
    /// Sum of object sizes, counting each object once (first-seen size).
    pub n_bytes: u64,
}

/// Deterministic 64-bit object-id hashing with an explicit seed.
///
/// Two hashers built from the same seed produce identical values, which is
/// what makes spatial sampling consistent across trace passes.
#[derive(Clone)]
pub struct SeededHasher {
    state: ahash::RandomState,
}

impl SeededHasher {
    /// Build a hasher whose output is a pure function of `seed` and the id.
    pub fn new(seed: u64) -> Self {
        let state = ahash::RandomState::with_seeds(
            seed ^ 0x243f_6a88_85a3_08d3,
            seed.rotate_left(23) ^ 0x1319_8a2e_0370_7344,
            0xa409_3822_299f_31d0,
            0x082e_fa98_ec4e_6c89,
        );
        Self { state }
    }

    /// Hash one object id to a uniform 64-bit value.
    #[inline]
    pub fn hash(&self, obj_id: u64) -> u64 {
        self.state.hash_one(obj_id)
    }
}

impl fmt::Debug for SeededHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SeededHasher { .. }")
    }
}

/// Largest hash value admitted at the given sampling rate.
#[inline]
pub fn rate_threshold(rate: f64) -> u64 {
    if rate >= 1.0 {
        u64::MAX
    } else {
        (u64::MAX as f64 * rate) as u64
    }
}

/// Deterministic spatial sampler: admits a request iff the seeded hash of
/// its object id is at most the rate-derived threshold.
#[derive(Clone)]
pub struct SpatialSampler {
    rate: f64,
    threshold: u64,
    hasher: SeededHasher,
}

impl SpatialSampler {
    /// Build a sampler for `rate` in `(0, 1]`.
    pub fn new(rate: f64, seed: u64) -> Result<Self> {
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(Error::Config(format!(
                "sampling rate must be in (0, 1], got {rate}"
            )));
        }
        Ok(Self {
            rate,
            threshold: rate_threshold(rate),
            hasher: SeededHasher::new(seed),
        })
    }

    /// Configured sampling rate.
    #[inline]
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Reciprocal of the sampling rate, used to scale counters back up.
    #[inline]
    pub fn ratio_inv(&self) -> f64 {
        1.0 / self.rate
    }

    /// Whether the object is part of the sample.
    #[inline]
    pub fn sample(&self, obj_id: u64) -> bool {
        self.hasher.hash(obj_id) <= self.threshold
    }
}

impl fmt::Debug for SpatialSampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialSampler")
            .field("rate", &self.rate)
            .field("threshold", &self.threshold)
            .finish()
    }
}

/// Stream of trace requests consumed by the profilers.
///
/// A reader is owned by exactly one profiler at a time. [`reset`] rewinds to
/// the first record; installing a spatial sampler makes subsequent reads
/// emit only sampled requests (consistently across resets).
///
/// [`reset`]: TraceReader::reset
pub trait TraceReader {
    /// Next request, or `None` at end of trace.
    fn read_next(&mut self) -> Result<Option<Request>>;

    /// Rewind to the first record.
    fn reset(&mut self) -> Result<()>;

    /// Filter all subsequent reads through `sampler`.
    fn install_spatial_sampler(&mut self, sampler: SpatialSampler);

    /// Scan the stream as currently configured, accumulate the working set,
    /// and rewind.
    fn working_set(&mut self) -> Result<WorkingSet> {
        let mut seen: HashMap<u64, u64> = HashMap::new();
        while let Some(req) = self.read_next()? {
            seen.entry(req.obj_id).or_insert(req.obj_size);
        }
        let ws = WorkingSet {
            n_obj: seen.len() as u64,
            n_bytes: seen.values().sum(),
        };
        self.reset()?;
        Ok(ws)
    }
}

/// In-memory trace, mainly for tests and programmatic use.
#[derive(Debug, Clone)]
pub struct MemoryReader {
    requests: Vec<Request>,
    pos: usize,
    sampler: Option<SpatialSampler>,
}

impl MemoryReader {
    /// Wrap a pre-built request vector.
    pub fn new(requests: Vec<Request>) -> Self {
        Self {
            requests,
            pos: 0,
            sampler: None,
        }
    }

    /// Unit-sized trace from a sequence of object ids; `time` is the 1-based
    /// position in the sequence.
    pub fn from_ids(ids: &[u64]) -> Self {
        let requests = ids
            .iter()
            .enumerate()
            .map(|(i, &id)| Request::new(i as u64 + 1, id, 1))
            .collect();
        Self::new(requests)
    }
}

impl TraceReader for MemoryReader {
    fn read_next(&mut self) -> Result<Option<Request>> {
        while self.pos < self.requests.len() {
            let req = self.requests[self.pos];
            self.pos += 1;
            match &self.sampler {
                Some(s) if !s.sample(req.obj_id) => {}
                _ => return Ok(Some(req)),
            }
        }
        Ok(None)
    }

    fn reset(&mut self) -> Result<()> {
        self.pos = 0;
        Ok(())
    }

    fn install_spatial_sampler(&mut self, sampler: SpatialSampler) {
        self.sampler = Some(sampler);
    }
}
