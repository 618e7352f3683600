//! Synthetic trace generation.
//!
//! Writes a CSV trace with skewed object popularity: a uniform draw is
//! raised to the skew exponent, so low object ids soak up most of the
//! traffic (exponent 1.0 is uniform, higher is hotter). Each object's size
//! is a pure function of its id, so repeated accesses agree, and the whole
//! trace is reproducible from the seed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use mrc_rs::request::SeededHasher;
use mrc_rs::{Error, Result};

/// Parameters of a synthetic trace.
#[derive(Debug, Clone)]
pub struct GenerateConfig {
    /// Number of requests to emit.
    pub requests: u64,
    /// Size of the object universe.
    pub objects: u64,
    /// Popularity skew exponent (1.0 = uniform).
    pub skew: f64,
    /// Smallest object size in bytes.
    pub min_size: u64,
    /// Largest object size in bytes.
    pub max_size: u64,
    /// RNG seed.
    pub seed: u64,
    /// Output CSV path.
    pub output: PathBuf,
}

/// Write the trace described by `config`.
pub fn generate(config: &GenerateConfig) -> Result<()> {
    if config.objects == 0 || config.requests == 0 {
        return Err(Error::Config(
            "trace generation needs at least one object and one request".into(),
        ));
    }
    if config.min_size == 0 || config.min_size > config.max_size {
        return Err(Error::Config(format!(
            "invalid size range {}..{}",
            config.min_size, config.max_size
        )));
    }
    if config.skew < 1.0 {
        return Err(Error::Config(format!(
            "skew exponent must be at least 1.0, got {}",
            config.skew
        )));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let sizer = SeededHasher::new(config.seed ^ 0x5157_9a7a);
    let span = config.max_size - config.min_size + 1;

    let mut out = BufWriter::new(File::create(&config.output)?);
    writeln!(out, "timestamp,obj_id,obj_size")?;
    let mut timestamp = 0u64;
    for _ in 0..config.requests {
        let u: f64 = rng.gen();
        let obj_id = (u.powf(config.skew) * config.objects as f64) as u64;
        let obj_id = obj_id.min(config.objects - 1);
        let obj_size = config.min_size + sizer.hash(obj_id) % span;
        timestamp += 1 + u64::from(obj_id % 7 == 0);
        writeln!(out, "{timestamp},{obj_id},{obj_size}")?;
    }
    out.flush()?;
    info!(
        requests = config.requests,
        objects = config.objects,
        path = %config.output.display(),
        "trace written"
    );
    Ok(())
}
