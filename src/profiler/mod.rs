//! Miss-ratio-curve profilers.
//!
//! A profiler consumes one trace through a [`TraceReader`] and produces an
//! [`MrcCurve`]: cumulative weighted hit counters at every profiled cache
//! size, from which miss ratios fall out. Two strategies are provided:
//!
//! - [`ShardsProfiler`] - hash-sampled weighted reuse distances for LRU,
//!   in one pass;
//! - [`MinisimProfiler`] - spatially sample the trace, then run every
//!   profiled size as a real downscaled cache simulation in parallel.
//!
//! Dispatch is a tagged [`Profiler`] variant; both arms share the result
//! type and the table writer.
//!
//! [`TraceReader`]: crate::request::TraceReader

use std::io::{self, Write};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::policy::PolicyCache;
use crate::request::TraceReader;
use crate::sizes::SizeVector;

pub mod minisim;
pub mod shards;

pub use minisim::MinisimProfiler;
pub use shards::ShardsProfiler;

/// Sampling mode of the SHARDS profiler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ShardsMode {
    /// Admit a fixed fraction of objects.
    FixedRate(f64),
    /// Adapt the rate to track at most this many objects.
    FixedSize(usize),
}

/// SHARDS profiler parameters, parsed from `FIX_RATE,<rate>,<seed>` or
/// `FIX_SIZE,<capacity>,<seed>`; the seed defaults to 42 when omitted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShardsParams {
    /// Sampling mode.
    pub mode: ShardsMode,
    /// Hash seed for spatial sampling.
    pub seed: u64,
}

impl FromStr for ShardsParams {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        if fields.len() < 2 || fields.len() > 3 {
            return Err(Error::Config(format!(
                "shards params must be FIX_RATE,<rate>[,seed] or FIX_SIZE,<capacity>[,seed], got `{s}`"
            )));
        }
        let seed = match fields.get(2) {
            Some(f) => f
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("invalid seed `{f}` in `{s}`")))?,
            None => 42,
        };
        let mode = match fields[0].to_ascii_uppercase().as_str() {
            "FIX_RATE" => {
                let rate: f64 = fields[1]
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid sample rate in `{s}`")))?;
                if !(rate > 0.0 && rate <= 1.0) {
                    return Err(Error::Config(format!(
                        "sample rate must be in (0, 1], got {rate}"
                    )));
                }
                ShardsMode::FixedRate(rate)
            }
            "FIX_SIZE" => {
                let capacity: usize = fields[1]
                    .parse()
                    .map_err(|_| Error::Config(format!("invalid sample capacity in `{s}`")))?;
                if capacity == 0 {
                    return Err(Error::Config("sample capacity must be positive".into()));
                }
                ShardsMode::FixedSize(capacity)
            }
            other => {
                return Err(Error::Config(format!(
                    "invalid sample type `{other}` for shards"
                )))
            }
        };
        Ok(Self { mode, seed })
    }
}

/// MINISIM profiler parameters, parsed from
/// `FIX_RATE,<rate>,<threads>[,seed]`; the seed defaults to 10000019.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MinisimParams {
    /// Spatial sampling rate in `(0, 1]`; rates above 0.5 disable sampling.
    pub rate: f64,
    /// Worker-thread budget for the parallel simulations.
    pub threads: usize,
    /// Spatial sampler seed.
    pub seed: u64,
}

impl FromStr for MinisimParams {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let fields: Vec<&str> = s.split(',').map(str::trim).collect();
        if fields.len() < 3 || fields.len() > 4 {
            return Err(Error::Config(format!(
                "minisim params must be FIX_RATE,<rate>,<threads>[,seed], got `{s}`"
            )));
        }
        if !fields[0].eq_ignore_ascii_case("FIX_RATE") {
            return Err(Error::Config(format!(
                "invalid sample type `{}` for minisim",
                fields[0]
            )));
        }
        let rate: f64 = fields[1]
            .parse()
            .map_err(|_| Error::Config(format!("invalid sample rate in `{s}`")))?;
        if !(rate > 0.0 && rate <= 1.0) {
            return Err(Error::Config(format!(
                "sample rate must be in (0, 1], got {rate}"
            )));
        }
        let threads: usize = fields[2]
            .parse()
            .map_err(|_| Error::Config(format!("invalid thread count in `{s}`")))?;
        if threads == 0 {
            return Err(Error::Config("thread count must be positive".into()));
        }
        let seed = match fields.get(3) {
            Some(f) => f
                .parse::<u64>()
                .map_err(|_| Error::Config(format!("invalid seed `{f}` in `{s}`")))?,
            None => 10_000_019,
        };
        Ok(Self {
            rate,
            threads,
            seed,
        })
    }
}

/// Result of a profiling run: cumulative weighted hits per profiled size.
#[derive(Debug, Clone)]
pub struct MrcCurve {
    /// Profiled cache sizes in bytes, strictly increasing.
    pub sizes: Vec<u64>,
    /// Working-set fractions behind the sizes, when the spec was relative.
    pub wss_ratios: Option<Vec<f64>>,
    /// Weighted request hits at each size (cumulative).
    pub hit_count: Vec<f64>,
    /// Weighted byte hits at each size (cumulative).
    pub hit_bytes: Vec<f64>,
    /// Requests in the trace.
    pub n_req: u64,
    /// Bytes requested in the trace.
    pub sum_obj_size_req: u64,
}

impl MrcCurve {
    pub(crate) fn new(sizes: &SizeVector) -> Self {
        Self {
            sizes: sizes.sizes.clone(),
            wss_ratios: sizes.wss_ratios.clone(),
            hit_count: vec![0.0; sizes.len()],
            hit_bytes: vec![0.0; sizes.len()],
            n_req: 0,
            sum_obj_size_req: 0,
        }
    }

    /// Number of profile points.
    #[inline]
    pub fn len(&self) -> usize {
        self.sizes.len()
    }

    /// True when no profile points exist.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sizes.is_empty()
    }

    /// Miss ratio at profile point `i`, clipped to `[0, 1]`.
    pub fn miss_rate(&self, i: usize) -> f64 {
        if self.n_req == 0 {
            return 1.0;
        }
        clip01(1.0 - self.hit_count[i] / self.n_req as f64)
    }

    /// Byte miss ratio at profile point `i`, clipped to `[0, 1]`.
    pub fn byte_miss_rate(&self, i: usize) -> f64 {
        if self.sum_obj_size_req == 0 {
            return 1.0;
        }
        clip01(1.0 - self.hit_bytes[i] / self.sum_obj_size_req as f64)
    }

    /// Write the tab-separated MRC table.
    pub fn write_table<W: Write>(&self, out: &mut W) -> io::Result<()> {
        if self.wss_ratios.is_some() {
            write!(out, "wss_ratio\t")?;
        }
        writeln!(out, "cache_size\tmiss_rate\tbyte_miss_rate")?;
        for i in 0..self.len() {
            if let Some(ratios) = &self.wss_ratios {
                write!(out, "{:.6}\t", ratios[i])?;
            }
            writeln!(
                out,
                "{}B\t{:.6}\t{:.6}",
                self.sizes[i],
                self.miss_rate(i),
                self.byte_miss_rate(i)
            )?;
        }
        Ok(())
    }
}

fn clip01(x: f64) -> f64 {
    x.clamp(0.0, 1.0)
}

/// A configured profiling strategy.
#[derive(Debug)]
pub enum Profiler {
    /// SHARDS reuse-distance estimation (LRU only).
    Shards(ShardsProfiler),
    /// Sampled multi-size simulation (any policy).
    Minisim(MinisimProfiler),
}

impl Profiler {
    /// SHARDS profiler; `algo` must be LRU.
    pub fn shards(params: ShardsParams, algo: &str, sizes: SizeVector) -> Result<Self> {
        if !algo.eq_ignore_ascii_case("lru") {
            return Err(Error::Config(format!(
                "SHARDS profiles LRU only, got `{algo}`"
            )));
        }
        if sizes.is_empty() {
            return Err(Error::Config("size vector is empty".into()));
        }
        Ok(Profiler::Shards(ShardsProfiler::new(params, sizes)))
    }

    /// MINISIM profiler for any supported policy.
    pub fn minisim(params: MinisimParams, algo: &str, sizes: SizeVector) -> Result<Self> {
        if !PolicyCache::is_supported(algo) {
            return Err(Error::Policy(algo.to_string()));
        }
        if sizes.is_empty() {
            return Err(Error::Config("size vector is empty".into()));
        }
        Ok(Profiler::Minisim(MinisimProfiler::new(params, algo, sizes)))
    }

    /// Profiler name for reporting.
    pub fn name(&self) -> &'static str {
        match self {
            Profiler::Shards(_) => "SHARDS",
            Profiler::Minisim(_) => "MINISIM",
        }
    }

    /// Consume the trace and produce the curve.
    pub fn run(&mut self, reader: &mut dyn TraceReader) -> Result<MrcCurve> {
        match self {
            Profiler::Shards(p) => p.run(reader),
            Profiler::Minisim(p) => p.run(reader),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizes::SizeSpec;

    #[test]
    fn shards_params_parse() {
        let p: ShardsParams = "FIX_RATE,0.01,7".parse().unwrap();
        assert_eq!(p.mode, ShardsMode::FixedRate(0.01));
        assert_eq!(p.seed, 7);
        let p: ShardsParams = "fix_size,8192".parse().unwrap();
        assert_eq!(p.mode, ShardsMode::FixedSize(8192));
        assert_eq!(p.seed, 42);

        assert!("".parse::<ShardsParams>().is_err());
        assert!("FIX_RATE,0".parse::<ShardsParams>().is_err());
        assert!("FIX_RATE,1.5".parse::<ShardsParams>().is_err());
        assert!("FIX_SIZE,0".parse::<ShardsParams>().is_err());
        assert!("FIX_WAT,0.5".parse::<ShardsParams>().is_err());
        assert!("FIX_RATE,0.5,1,2".parse::<ShardsParams>().is_err());
    }

    #[test]
    fn minisim_params_parse() {
        let p: MinisimParams = "FIX_RATE,0.05,8".parse().unwrap();
        assert_eq!(p.rate, 0.05);
        assert_eq!(p.threads, 8);
        assert_eq!(p.seed, 10_000_019);
        let p: MinisimParams = "fix_rate,0.25,2,123".parse().unwrap();
        assert_eq!(p.seed, 123);

        assert!("FIX_RATE,0.05".parse::<MinisimParams>().is_err());
        assert!("FIX_RATE,0.05,0".parse::<MinisimParams>().is_err());
        assert!("FIX_SIZE,0.05,2".parse::<MinisimParams>().is_err());
    }

    #[test]
    fn profiler_constructors_validate_before_running() {
        let sizes = "1,2,3,4"
            .parse::<SizeSpec>()
            .unwrap()
            .resolve(None)
            .unwrap();
        let sp: ShardsParams = "FIX_RATE,1.0,1".parse().unwrap();
        assert!(Profiler::shards(sp, "lru", sizes.clone()).is_ok());
        let err = Profiler::shards(sp, "fifo", sizes.clone()).unwrap_err();
        assert!(err.is_pre_run());

        let mp: MinisimParams = "FIX_RATE,0.4,2".parse().unwrap();
        assert!(Profiler::minisim(mp, "clock", sizes.clone()).is_ok());
        let err = Profiler::minisim(mp, "nonsense", sizes).unwrap_err();
        assert!(matches!(err, Error::Policy(_)));
    }

    #[test]
    fn table_output_shape() {
        let sizes = SizeVector {
            sizes: vec![100, 200],
            wss_ratios: Some(vec![0.5, 1.0]),
        };
        let mut curve = MrcCurve::new(&sizes);
        curve.n_req = 10;
        curve.sum_obj_size_req = 1000;
        curve.hit_count = vec![2.0, 8.0];
        curve.hit_bytes = vec![100.0, 900.0];
        let mut buf = Vec::new();
        curve.write_table(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "wss_ratio\tcache_size\tmiss_rate\tbyte_miss_rate");
        assert_eq!(lines[1], "0.500000\t100B\t0.800000\t0.900000");
        assert_eq!(lines[2], "1.000000\t200B\t0.200000\t0.100000");
        assert!(text.ends_with('\n'));
    }

    #[test]
    fn rates_are_clipped() {
        let sizes = SizeVector {
            sizes: vec![10],
            wss_ratios: None,
        };
        let mut curve = MrcCurve::new(&sizes);
        curve.n_req = 4;
        curve.sum_obj_size_req = 4;
        curve.hit_count = vec![8.0]; // overshoot from scaling
        curve.hit_bytes = vec![-3.0];
        assert_eq!(curve.miss_rate(0), 0.0);
        assert_eq!(curve.byte_miss_rate(0), 1.0);
    }
}
