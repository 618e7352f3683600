//! Miss-ratio-curve profiler CLI.
//!
//! ```text
//! mrc-profiler trace.csv csv --algo lru --profiler SHARDS \
//!     --profiler-params FIX_RATE,0.01,42 --size 0.01,1,100
//! ```
//!
//! The MRC table goes to stdout (or `--output`); diagnostics go to stderr
//! via `tracing`, so stdout stays machine-parseable. Exit status is zero on
//! success and non-zero on any configuration, policy, or I/O failure.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mrc_rs::Result;

mod generate;
mod input;
mod runner;

use generate::GenerateConfig;
use runner::{ProfilerRunner, RunnerConfig};

/// Trace-driven miss-ratio-curve profiler.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Trace file to profile
    #[arg(value_name = "TRACE_PATH", required_unless_present = "command")]
    trace_path: Option<PathBuf>,

    /// Trace format: csv or txt
    #[arg(value_name = "TRACE_KIND", required_unless_present = "command")]
    trace_kind: Option<String>,

    /// Eviction algorithm to profile (lru, fifo, clock, belady-online)
    #[arg(long, default_value = "lru")]
    algo: String,

    /// Profiler to use: SHARDS or MINISIM
    #[arg(long, default_value = "SHARDS")]
    profiler: String,

    /// Profiler parameters: FIX_RATE,<rate>,<seed> or FIX_SIZE,<capacity>,<seed>
    /// for SHARDS; FIX_RATE,<rate>,<threads>[,seed] for MINISIM
    #[arg(long, default_value = "FIX_RATE,0.01,42")]
    profiler_params: String,

    /// Profile sizes: bytes (64MiB,1GiB,...), working-set fractions
    /// (0.001,0.01,...), or an interval (start,end,count)
    #[arg(long, default_value = "0.01,1,100")]
    size: String,

    /// Write the MRC table here instead of stdout
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Also export the table as CSV
    #[arg(long, value_name = "PATH")]
    output_csv: Option<PathBuf>,

    /// Process at most this many trace records per pass
    #[arg(short, long, value_name = "N")]
    num_req: Option<u64>,

    /// Log progress details to stderr
    #[arg(short, long)]
    verbose: bool,
}

/// Subcommands for the CLI.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a synthetic skewed-popularity trace
    Generate {
        /// Number of requests
        #[arg(long, default_value = "1000000")]
        requests: u64,

        /// Number of unique objects
        #[arg(long, default_value = "10000")]
        objects: u64,

        /// Popularity skew exponent (1.0 = uniform, higher = hotter head)
        #[arg(long, default_value = "2.0")]
        skew: f64,

        /// Minimum object size in bytes
        #[arg(long, default_value = "128")]
        min_size: u64,

        /// Maximum object size in bytes
        #[arg(long, default_value = "65536")]
        max_size: u64,

        /// RNG seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output CSV path
        #[arg(short, long, default_value = "trace.csv")]
        output: PathBuf,

        /// Log progress details to stderr
        #[arg(short, long)]
        verbose: bool,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(match &args.command {
        Some(Commands::Generate { verbose, .. }) => *verbose,
        None => args.verbose,
    });

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("mrc-profiler: {err}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(args: Args) -> Result<()> {
    match args.command {
        Some(Commands::Generate {
            requests,
            objects,
            skew,
            min_size,
            max_size,
            seed,
            output,
            verbose: _,
        }) => generate::generate(&GenerateConfig {
            requests,
            objects,
            skew,
            min_size,
            max_size,
            seed,
            output,
        }),

        None => {
            // clap enforces the positionals when no subcommand is given
            let trace_path = args.trace_path.unwrap_or_default();
            let trace_kind = args.trace_kind.unwrap_or_default().parse()?;
            let config = RunnerConfig {
                trace_path,
                trace_kind,
                algo: args.algo,
                profiler: args.profiler.parse()?,
                profiler_params: args.profiler_params,
                size_spec: args.size,
                output: args.output,
                output_csv: args.output_csv,
                num_req: args.num_req,
            };
            ProfilerRunner::new(config).run()?;
            Ok(())
        }
    }
}
