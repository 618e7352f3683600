//! Error types shared by the profilers, readers, and policies.
//!
//! Configuration and policy errors are produced by constructors and parsers
//! before any trace record is read, so a misconfigured run fails without
//! touching the trace. I/O and parse errors carry enough context to point at
//! the offending record.

use std::io;

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// All failure modes of a profiling run.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid size spec, profiler parameters, or profiler/algorithm pairing.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The trace could not be opened or read.
    #[error("trace I/O error: {0}")]
    Io(#[from] io::Error),

    /// A trace record could not be parsed.
    #[error("trace parse error: {0}")]
    Parse(String),

    /// The requested eviction policy does not exist.
    #[error("unknown eviction policy `{0}`")]
    Policy(String),

    /// An internal invariant was violated; results are not trustworthy.
    #[error("internal invariant violated: {0}")]
    Internal(String),
}

impl Error {
    /// True for errors that are detectable before the first trace read.
    pub fn is_pre_run(&self) -> bool {
        matches!(self, Error::Config(_) | Error::Policy(_))
    }
}
