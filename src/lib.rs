#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Crate layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`request`] | [`Request`] records, the [`TraceReader`] trait, [`MemoryReader`], spatial sampling |
//! | [`sizes`] | size-spec parsing ([`SizeSpec`]) and resolved [`SizeVector`]s |
//! | [`profiler`] | [`Profiler`] dispatch, [`ShardsProfiler`], [`MinisimProfiler`], [`MrcCurve`] |
//! | [`policy`] | [`PolicyCache`] eviction policies and the [`simulate_multi`] driver |
//! | [`reuse_tree`] | weighted order-statistic splay tree for stack distances |
//! | [`minmap`] | bounded min-value map for fixed-size sampling |
//! | [`segtree`] | lazy range-add/range-max segment tree for online Belady |
//! | [`error`] | unified [`Error`] / [`Result`] |
//!
//! # Quick example
//!
//! ```
//! use mrc_rs::{MemoryReader, Profiler, ShardsParams, SizeSpec};
//!
//! let params: ShardsParams = "FIX_RATE,1.0,42".parse()?;
//! let sizes = "1,2,3,4".parse::<SizeSpec>()?.resolve(None)?;
//! let mut profiler = Profiler::shards(params, "lru", sizes)?;
//!
//! let mut reader = MemoryReader::from_ids(&[1, 2, 3, 1, 2, 3, 1, 2, 3]);
//! let curve = profiler.run(&mut reader)?;
//! assert_eq!(curve.miss_rate(0), 1.0);
//! assert!((curve.miss_rate(2) - 1.0 / 3.0).abs() < 1e-12);
//! # Ok::<(), mrc_rs::Error>(())
//! ```

/// Error types shared across the crate.
pub mod error;

/// Bounded min-value map keeping the smallest-scored keys.
///
/// Backs the adaptive sample of fixed-size SHARDS: the key is an object id,
/// the score its seeded hash, and the map holds the `T` smallest hashes
/// seen so far.
pub mod minmap;

/// Eviction policies (`lru`, `fifo`, `clock`, `belady-online`) and the
/// multi-cache simulation driver used by MINISIM.
pub mod policy;

/// The SHARDS and MINISIM profilers, their parameter parsing, and the
/// [`MrcCurve`] result type.
pub mod profiler;

/// Trace records, the reader abstraction, and deterministic spatial
/// sampling.
pub mod request;

/// Weighted order-statistic splay tree; one `distance` query per reuse
/// yields the byte-weighted LRU stack distance.
pub mod reuse_tree;

/// Lazy range-add / range-max segment tree over virtual time, the occupancy
/// function behind the online-Belady lower bound.
pub mod segtree;

/// Cache-size vector specifications: absolute bytes, working-set fractions,
/// intervals, and lists.
pub mod sizes;

pub use error::{Error, Result};
pub use minmap::MinValueMap;
pub use policy::{simulate_multi, CacheStats, PolicyCache, PolicyConfig};
pub use profiler::{
    MinisimParams, MinisimProfiler, MrcCurve, Profiler, ShardsMode, ShardsParams, ShardsProfiler,
};
pub use request::{MemoryReader, Request, SpatialSampler, TraceReader, WorkingSet};
pub use reuse_tree::ReuseTree;
pub use segtree::LazySegmentTree;
pub use sizes::{SizeSpec, SizeVector};
