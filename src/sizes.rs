//! Cache-size vector specifications.
//!
//! A profile run evaluates the miss ratio at an ordered list of cache sizes.
//! The comma-separated spec accepts four shapes, tried in order:
//!
//! 1. any token carrying letters - absolute byte sizes with `K`/`M`/`G`/`T`
//!    suffixes (optionally followed by `b`/`ib`), e.g. `64MiB,512MiB,4GiB`;
//! 2. first token a decimal with a `.` - working-set fractions in `[0, 1]`,
//!    e.g. `0.001,0.01,0.1`;
//! 3. three tokens whose last is an integer above 1 - an interval
//!    `(start, end, count)` of either shape, producing `count` evenly spaced
//!    points with inclusive endpoints, e.g. `0.01,1,100` or `1MiB,1GiB,64`;
//! 4. otherwise - a plain list, one size per token.
//!
//! Fraction-based specs are resolved against the trace's working-set size
//! before profiling. The resolved vector must be strictly increasing and
//! non-empty; violations are configuration errors raised before any trace
//! read.

use std::str::FromStr;

use crate::error::{Error, Result};

/// Bytes per KiB.
pub const KIB: u64 = 1024;
/// Bytes per MiB.
pub const MIB: u64 = 1024 * KIB;
/// Bytes per GiB.
pub const GIB: u64 = 1024 * MIB;
/// Bytes per TiB.
pub const TIB: u64 = 1024 * GIB;

/// Parsed but not yet resolved size specification.
#[derive(Debug, Clone, PartialEq)]
pub enum SizeSpec {
    /// Absolute cache sizes in bytes.
    Bytes(Vec<u64>),
    /// Fractions of the working-set size.
    Ratios(Vec<f64>),
}

/// Resolved, strictly increasing profile sizes.
#[derive(Debug, Clone, PartialEq)]
pub struct SizeVector {
    /// Cache sizes in bytes, strictly increasing.
    pub sizes: Vec<u64>,
    /// The originating working-set fractions, if the spec was fraction-based.
    pub wss_ratios: Option<Vec<f64>>,
}

impl SizeSpec {
    /// Whether resolution requires the working-set size.
    pub fn is_wss_relative(&self) -> bool {
        matches!(self, SizeSpec::Ratios(_))
    }

    /// Resolve into absolute byte sizes. `wss_bytes` is required for
    /// fraction-based specs and ignored otherwise.
    pub fn resolve(&self, wss_bytes: Option<u64>) -> Result<SizeVector> {
        match self {
            SizeSpec::Bytes(v) => Ok(SizeVector {
                sizes: v.clone(),
                wss_ratios: None,
            }),
            SizeSpec::Ratios(ratios) => {
                let wss = wss_bytes.ok_or_else(|| {
                    Error::Config("working-set size required for a fraction-based size spec".into())
                })?;
                let sizes: Vec<u64> = ratios.iter().map(|r| (wss as f64 * r) as u64).collect();
                check_increasing_u64(&sizes).map_err(|_| {
                    Error::Config(format!(
                        "fraction spec resolves to non-increasing sizes against wss {wss}"
                    ))
                })?;
                Ok(SizeVector {
                    sizes,
                    wss_ratios: Some(ratios.clone()),
                })
            }
        }
    }
}

impl SizeVector {
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

    /// Index of the smallest size at or above `distance`, if any: the
    /// histogram bucket a reuse of that stack distance falls into.
    #[inline]
    pub fn first_fit(&self, distance: u64) -> Option<usize> {
        let idx = self.sizes.partition_point(|&s| s < distance);
        (idx < self.sizes.len()).then_some(idx)
    }
}

impl FromStr for SizeSpec {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let tokens: Vec<&str> = s.split(',').map(str::trim).filter(|t| !t.is_empty()).collect();
        if tokens.is_empty() {
            return Err(Error::Config("size spec is empty".into()));
        }

        let has_alpha = tokens
            .iter()
            .any(|t| t.chars().any(|c| c.is_ascii_alphabetic()));
        let ratio_mode = !has_alpha && tokens[0].contains('.');
        let interval_count = if tokens.len() == 3 && is_plain_integer(tokens[2]) {
            tokens[2].parse::<u64>().ok().filter(|&n| n > 1)
        } else {
            None
        };

        if let Some(count) = interval_count {
            if ratio_mode {
                let start = parse_ratio(tokens[0])?;
                let end = parse_ratio(tokens[1])?;
                if start >= end {
                    return Err(Error::Config(format!(
                        "interval start {start} must be below end {end}"
                    )));
                }
                let step = (end - start) / (count - 1) as f64;
                let mut ratios: Vec<f64> =
                    (0..count - 1).map(|i| start + step * i as f64).collect();
                ratios.push(end);
                check_increasing_f64(&ratios)?;
                Ok(SizeSpec::Ratios(ratios))
            } else {
                let start = parse_byte_size(tokens[0])?;
                let end = parse_byte_size(tokens[1])?;
                if start >= end {
                    return Err(Error::Config(format!(
                        "interval start {start} must be below end {end}"
                    )));
                }
                let step = (end - start) / (count - 1);
                let mut sizes: Vec<u64> = (0..count - 1).map(|i| start + step * i).collect();
                sizes.push(end);
                check_increasing_u64(&sizes).map_err(|_| {
                    Error::Config(format!(
                        "interval {start}..{end} is too narrow for {count} points"
                    ))
                })?;
                Ok(SizeSpec::Bytes(sizes))
            }
        } else if ratio_mode {
            let ratios: Vec<f64> = tokens
                .iter()
                .map(|t| parse_ratio(t))
                .collect::<Result<_>>()?;
            check_increasing_f64(&ratios)?;
            Ok(SizeSpec::Ratios(ratios))
        } else {
            let sizes: Vec<u64> = tokens
                .iter()
                .map(|t| parse_byte_size(t))
                .collect::<Result<_>>()?;
            check_increasing_u64(&sizes)
                .map_err(|_| Error::Config(format!("sizes must be strictly increasing: `{s}`")))?;
            Ok(SizeSpec::Bytes(sizes))
        }
    }
}

fn is_plain_integer(tok: &str) -> bool {
    !tok.is_empty() && tok.bytes().all(|b| b.is_ascii_digit())
}

/// Parse one absolute size token, e.g. `4096`, `64K`, `100mb`, `2GiB`.
fn parse_byte_size(tok: &str) -> Result<u64> {
    let split = tok
        .find(|c: char| c.is_ascii_alphabetic())
        .unwrap_or(tok.len());
    let (num, suffix) = tok.split_at(split);
    let value: u64 = num
        .parse()
        .map_err(|_| Error::Config(format!("invalid size token `{tok}`")))?;
    let multiplier = match suffix.to_ascii_lowercase().as_str() {
        "" | "b" => 1,
        "k" | "kb" | "kib" => KIB,
        "m" | "mb" | "mib" => MIB,
        "g" | "gb" | "gib" => GIB,
        "t" | "tb" | "tib" => TIB,
        _ => {
            return Err(Error::Config(format!(
                "unknown size suffix `{suffix}` in `{tok}`"
            )))
        }
    };
    value
        .checked_mul(multiplier)
        .ok_or_else(|| Error::Config(format!("size token `{tok}` overflows")))
}

fn parse_ratio(tok: &str) -> Result<f64> {
    let value: f64 = tok
        .parse()
        .map_err(|_| Error::Config(format!("invalid working-set fraction `{tok}`")))?;
    if !(0.0..=1.0).contains(&value) {
        return Err(Error::Config(format!(
            "working-set fraction {value} outside [0, 1]"
        )));
    }
    Ok(value)
}

fn check_increasing_u64(v: &[u64]) -> Result<()> {
    for w in v.windows(2) {
        if w[0] >= w[1] {
            return Err(Error::Config("sizes must be strictly increasing".into()));
        }
    }
    Ok(())
}

fn check_increasing_f64(v: &[f64]) -> Result<()> {
    for w in v.windows(2) {
        if w[0] >= w[1] {
            return Err(Error::Config(
                "working-set fractions must be strictly increasing".into(),
            ));
        }
    }
    Ok(())
}
