//! Eviction policies driven by the MINISIM profiler.
//!
//! Each policy is a byte-budget cache over object ids that answers one
//! question per request: would this have been a hit? Policies are dispatched
//! through the [`PolicyCache`] tagged variant rather than trait objects, so
//! worker threads can own them by value.
//!
//! [`simulate_multi`] drives one sampled request stream through many cache
//! instances at once: caches are split into contiguous chunks, each chunk is
//! moved into one worker, and every worker replays the full stream in trace
//! order. Workers share nothing mutable; a failed worker raises an abort
//! flag and all others stop at the next request boundary, invalidating the
//! run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crate::error::{Error, Result};
use crate::request::Request;

pub mod belady;
pub mod clock;
pub mod fifo;
pub mod lru;

mod list;

pub use belady::BeladyOnline;
pub use clock::ClockCache;
pub use fifo::FifoCache;
pub use lru::LruCache;

/// Construction parameters shared by all policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Byte budget of the cache.
    pub cache_size: u64,
    /// Metadata bytes charged per cached object on top of its size.
    pub per_obj_overhead: u64,
}

impl PolicyConfig {
    /// Config with the given budget and no per-object overhead.
    pub fn new(cache_size: u64) -> Self {
        Self {
            cache_size,
            per_obj_overhead: 0,
        }
    }
}

/// Hit/miss counters of one simulated cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Requests observed.
    pub n_req: u64,
    /// Requests that missed.
    pub n_miss: u64,
    /// Bytes requested.
    pub n_req_byte: u64,
    /// Bytes that missed.
    pub n_miss_byte: u64,
}

impl CacheStats {
    /// Record one request outcome.
    #[inline]
    pub fn record(&mut self, obj_size: u64, hit: bool) {
        self.n_req += 1;
        self.n_req_byte += obj_size;
        if !hit {
            self.n_miss += 1;
            self.n_miss_byte += obj_size;
        }
    }

    /// Fraction of requests that missed; 1.0 before any request.
    pub fn miss_ratio(&self) -> f64 {
        if self.n_req == 0 {
            1.0
        } else {
            self.n_miss as f64 / self.n_req as f64
        }
    }

    /// Fraction of requested bytes that missed; 1.0 before any request.
    pub fn byte_miss_ratio(&self) -> f64 {
        if self.n_req_byte == 0 {
            1.0
        } else {
            self.n_miss_byte as f64 / self.n_req_byte as f64
        }
    }
}

/// One cache instance of any supported policy.
#[derive(Debug)]
pub enum PolicyCache {
    /// Least recently used.
    Lru(LruCache),
    /// First in, first out.
    Fifo(FifoCache),
    /// Second-chance clock.
    Clock(ClockCache),
    /// Online Belady / OPT lower bound.
    Belady(BeladyOnline),
}

impl PolicyCache {
    /// True if `name` maps to a policy; usable before any trace read.
    pub fn is_supported(name: &str) -> bool {
        matches!(
            name.to_ascii_lowercase().as_str(),
            "lru" | "fifo" | "clock" | "belady" | "belady-online" | "beladyonline"
        )
    }

    /// Instantiate a policy by name.
    pub fn create(name: &str, config: PolicyConfig) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "lru" => Ok(PolicyCache::Lru(LruCache::new(config))),
            "fifo" => Ok(PolicyCache::Fifo(FifoCache::new(config))),
            "clock" => Ok(PolicyCache::Clock(ClockCache::new(config))),
            "belady" | "belady-online" | "beladyonline" => {
                Ok(PolicyCache::Belady(BeladyOnline::new(config)))
            }
            _ => Err(Error::Policy(name.to_string())),
        }
    }

    /// Canonical policy name.
    pub fn name(&self) -> &'static str {
        match self {
            PolicyCache::Lru(_) => "lru",
            PolicyCache::Fifo(_) => "fifo",
            PolicyCache::Clock(_) => "clock",
            PolicyCache::Belady(_) => "belady-online",
        }
    }

    /// Process one request: true on hit.
    #[inline]
    pub fn get(&mut self, req: &Request) -> bool {
        match self {
            PolicyCache::Lru(c) => c.get(req),
            PolicyCache::Fifo(c) => c.get(req),
            PolicyCache::Clock(c) => c.get(req),
            PolicyCache::Belady(c) => c.get(req),
        }
    }

    /// Hit/miss counters accumulated so far.
    pub fn stats(&self) -> &CacheStats {
        match self {
            PolicyCache::Lru(c) => c.stats(),
            PolicyCache::Fifo(c) => c.stats(),
            PolicyCache::Clock(c) => c.stats(),
            PolicyCache::Belady(c) => c.stats(),
        }
    }
}

/// Replay `requests` through every cache, using up to `threads` workers.
///
/// Each worker owns a contiguous chunk of the caches and sees every request
/// in order, so results are identical to a sequential run. Returns one
/// [`CacheStats`] per cache, in input order. If any worker fails, the whole
/// run fails and no partial counters are returned.
pub fn simulate_multi(
    requests: &[Request],
    caches: Vec<PolicyCache>,
    threads: usize,
) -> Result<Vec<CacheStats>> {
    if caches.is_empty() {
        return Ok(Vec::new());
    }
    let threads = threads.max(1).min(caches.len());
    if threads == 1 {
        let mut caches = caches;
        drive(requests, &mut caches, None)?;
        return Ok(caches.iter().map(|c| *c.stats()).collect());
    }

    // contiguous chunks whose sizes differ by at most one
    let total = caches.len();
    let base = total / threads;
    let extra = total % threads;
    let mut chunks: Vec<Vec<PolicyCache>> = Vec::with_capacity(threads);
    let mut rest = caches;
    for i in 0..threads {
        let take = base + usize::from(i < extra);
        let tail = rest.split_off(take);
        chunks.push(rest);
        rest = tail;
    }
    debug_assert!(rest.is_empty());

    let abort = AtomicBool::new(false);
    let joined: Vec<Result<Vec<CacheStats>>> = thread::scope(|s| {
        let abort = &abort;
        let handles: Vec<_> = chunks
            .into_iter()
            .map(|mut chunk| {
                s.spawn(move || {
                    drive(requests, &mut chunk, Some(abort))
                        .map(|()| chunk.iter().map(|c| *c.stats()).collect::<Vec<_>>())
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    abort.store(true, Ordering::Relaxed);
                    Err(Error::Internal("simulation worker panicked".into()))
                })
            })
            .collect()
    });

    let mut out = Vec::with_capacity(total);
    for chunk in joined {
        out.extend(chunk?);
    }
    Ok(out)
}

fn drive(requests: &[Request], caches: &mut [PolicyCache], abort: Option<&AtomicBool>) -> Result<()> {
    for req in requests {
        if let Some(flag) = abort {
            if flag.load(Ordering::Relaxed) {
                return Err(Error::Internal("simulation aborted by another worker".into()));
            }
        }
        if req.obj_size == 0 {
            if let Some(flag) = abort {
                flag.store(true, Ordering::Relaxed);
            }
            return Err(Error::Internal(format!(
                "zero-size object {} in sampled stream",
                req.obj_id
            )));
        }
        for cache in caches.iter_mut() {
            cache.get(req);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_trace(ids: &[u64]) -> Vec<Request> {
        ids.iter()
            .enumerate()
            .map(|(i, &id)| Request::new(i as u64, id, 1))
            .collect()
    }

    #[test]
    fn create_by_name() {
        for name in ["lru", "LRU", "fifo", "clock", "belady-online", "Belady"] {
            assert!(PolicyCache::is_supported(name), "{name}");
            assert!(PolicyCache::create(name, PolicyConfig::new(10)).is_ok());
        }
        assert!(!PolicyCache::is_supported("arc"));
        assert!(matches!(
            PolicyCache::create("arc", PolicyConfig::new(10)),
            Err(Error::Policy(_))
        ));
    }

    #[test]
    fn multi_threaded_matches_single_threaded() {
        let trace = unit_trace(
            &(0..4000u64)
                .map(|i| (i * 17 + i / 7) % 101)
                .collect::<Vec<_>>(),
        );
        let sizes = [2u64, 4, 8, 16, 32, 64, 101];

        let make = || {
            sizes
                .iter()
                .map(|&s| PolicyCache::create("lru", PolicyConfig::new(s)).unwrap())
                .collect::<Vec<_>>()
        };
        let sequential = simulate_multi(&trace, make(), 1).unwrap();
        let parallel = simulate_multi(&trace, make(), 4).unwrap();
        let oversubscribed = simulate_multi(&trace, make(), 64).unwrap();
        assert_eq!(sequential, parallel);
        assert_eq!(sequential, oversubscribed);
        // larger LRU caches never miss more
        for pair in sequential.windows(2) {
            assert!(pair[0].n_miss >= pair[1].n_miss);
        }
    }

    #[test]
    fn zero_size_object_aborts_the_run() {
        let mut trace = unit_trace(&[1, 2, 3]);
        trace.push(Request::new(3, 9, 0));
        let caches = vec![
            PolicyCache::create("lru", PolicyConfig::new(4)).unwrap(),
            PolicyCache::create("fifo", PolicyConfig::new(4)).unwrap(),
        ];
        let err = simulate_multi(&trace, caches, 2).unwrap_err();
        assert!(matches!(err, Error::Internal(_)));
    }

    #[test]
    fn empty_cache_list() {
        let trace = unit_trace(&[1, 2]);
        assert!(simulate_multi(&trace, Vec::new(), 4).unwrap().is_empty());
    }

    #[test]
    fn stats_order_matches_input_order() {
        let trace = unit_trace(&[1, 2, 1, 3, 1, 2]);
        let caches = vec![
            PolicyCache::create("lru", PolicyConfig::new(1)).unwrap(),
            PolicyCache::create("lru", PolicyConfig::new(3)).unwrap(),
        ];
        let stats = simulate_multi(&trace, caches, 2).unwrap();
        assert_eq!(stats.len(), 2);
        assert!(stats[0].n_miss >= stats[1].n_miss);
        assert_eq!(stats[1].n_req, 6);
    }
}
