//! Profiler orchestration: validate, resolve sizes, run, report.
//!
//! All configuration is parsed and validated before the trace is touched;
//! only then does a fraction-based size spec trigger the working-set scan,
//! and the profiler consume the trace. The MRC table goes to stdout or the
//! `--output` file; an optional CSV export serializes the same rows for
//! spreadsheet use.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::Serialize;
use tracing::info;

use mrc_rs::{
    Error, MinisimParams, MrcCurve, PolicyCache, Profiler, Result, ShardsParams, SizeSpec,
    TraceReader,
};

use crate::input::{FileTraceReader, TraceKind};

/// Which profiling strategy to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfilerKind {
    /// Hash-sampled reuse distances (LRU only).
    Shards,
    /// Sampled multi-size simulation (any policy).
    Minisim,
}

impl FromStr for ProfilerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "shards" => Ok(ProfilerKind::Shards),
            "minisim" => Ok(ProfilerKind::Minisim),
            other => Err(Error::Config(format!(
                "profiler type `{other}` not supported (expected SHARDS or MINISIM)"
            ))),
        }
    }
}

/// Everything one profiling run needs.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Trace file path.
    pub trace_path: PathBuf,
    /// Trace file format.
    pub trace_kind: TraceKind,
    /// Eviction algorithm to profile.
    pub algo: String,
    /// Profiling strategy.
    pub profiler: ProfilerKind,
    /// Strategy parameter string (`FIX_RATE,...` / `FIX_SIZE,...`).
    pub profiler_params: String,
    /// Size spec string.
    pub size_spec: String,
    /// Table destination; stdout when absent.
    pub output: Option<PathBuf>,
    /// Optional CSV export of the same rows.
    pub output_csv: Option<PathBuf>,
    /// Cap on raw trace records per pass.
    pub num_req: Option<u64>,
}

enum ParsedParams {
    Shards(ShardsParams),
    Minisim(MinisimParams),
}

/// Binds a reader and a profiler and writes the MRC table.
#[derive(Debug)]
pub struct ProfilerRunner {
    config: RunnerConfig,
}

impl ProfilerRunner {
    /// Runner for the given configuration.
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    /// Execute the run and return the curve (also written to the outputs).
    pub fn run(&self) -> Result<MrcCurve> {
        // validate every parameter before the first trace read
        let spec: SizeSpec = self.config.size_spec.parse()?;
        let params = match self.config.profiler {
            ProfilerKind::Shards => {
                if !self.config.algo.eq_ignore_ascii_case("lru") {
                    return Err(Error::Config(format!(
                        "SHARDS profiles LRU only, got `{}`",
                        self.config.algo
                    )));
                }
                ParsedParams::Shards(self.config.profiler_params.parse()?)
            }
            ProfilerKind::Minisim => {
                if !PolicyCache::is_supported(&self.config.algo) {
                    return Err(Error::Policy(self.config.algo.clone()));
                }
                ParsedParams::Minisim(self.config.profiler_params.parse()?)
            }
        };

        let mut reader = FileTraceReader::open(
            &self.config.trace_path,
            self.config.trace_kind,
            self.config.num_req,
        )?;

        let sizes = if spec.is_wss_relative() {
            let ws = reader.working_set()?;
            info!(
                n_obj = ws.n_obj,
                n_bytes = ws.n_bytes,
                "working set computed"
            );
            spec.resolve(Some(ws.n_bytes))?
        } else {
            spec.resolve(None)?
        };

        let mut profiler = match params {
            ParsedParams::Shards(p) => Profiler::shards(p, &self.config.algo, sizes)?,
            ParsedParams::Minisim(p) => Profiler::minisim(p, &self.config.algo, sizes)?,
        };

        info!(
            profiler = profiler.name(),
            trace = %self.config.trace_path.display(),
            algo = %self.config.algo,
            "profiling"
        );
        let curve = profiler.run(&mut reader)?;
        info!(
            n_req = curve.n_req,
            sum_obj_size_req = curve.sum_obj_size_req,
            "run complete"
        );

        self.write_outputs(&curve)?;
        Ok(curve)
    }

    fn write_outputs(&self, curve: &MrcCurve) -> Result<()> {
        match &self.config.output {
            Some(path) => {
                let mut file = File::create(path)?;
                curve.write_table(&mut file)?;
            }
            None => {
                let stdout = io::stdout();
                let mut lock = stdout.lock();
                curve.write_table(&mut lock)?;
                lock.flush()?;
            }
        }
        if let Some(path) = &self.config.output_csv {
            export_csv(curve, path)?;
        }
        Ok(())
    }
}

/// One CSV export row.
#[derive(Debug, Serialize)]
struct CsvRow {
    wss_ratio: Option<f64>,
    cache_size: u64,
    miss_rate: f64,
    byte_miss_rate: f64,
}

fn export_csv(curve: &MrcCurve, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).map_err(csv_to_io)?;
    for i in 0..curve.len() {
        let row = CsvRow {
            wss_ratio: curve.wss_ratios.as_ref().map(|r| r[i]),
            cache_size: curve.sizes[i],
            miss_rate: curve.miss_rate(i),
            byte_miss_rate: curve.byte_miss_rate(i),
        };
        writer.serialize(row).map_err(csv_to_io)?;
    }
    writer.flush()?;
    Ok(())
}

fn csv_to_io(err: csv::Error) -> Error {
    Error::Io(io::Error::other(err))
}
