//! File-backed trace readers.
//!
//! Two on-disk formats are supported:
//!
//! - `csv` - `timestamp,obj_id,obj_size` per line; a header row, `#`
//!   comments, and blank lines are skipped; extra columns are ignored.
//! - `txt` - whitespace-separated `obj_id [obj_size]` per line; the size
//!   defaults to 1 and the timestamp is the record ordinal.
//!
//! The reader streams with a large buffer, never materializing the trace.
//! Resetting reopens the file. An optional request cap bounds how many raw
//! records are emitted (it counts records before spatial sampling, so a
//! capped sampled run sees the same prefix of the trace as a capped raw
//! run), and an installed spatial sampler filters what the profilers see.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use mrc_rs::{Error, Request, Result, SpatialSampler, TraceReader};

/// On-disk trace format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceKind {
    /// `timestamp,obj_id,obj_size` comma-separated records.
    Csv,
    /// `obj_id [obj_size]` whitespace-separated records.
    Txt,
}

impl FromStr for TraceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(TraceKind::Csv),
            "txt" => Ok(TraceKind::Txt),
            other => Err(Error::Config(format!(
                "unsupported trace kind `{other}` (expected csv or txt)"
            ))),
        }
    }
}

/// Streaming reader over a single trace file.
#[derive(Debug)]
pub struct FileTraceReader {
    path: PathBuf,
    kind: TraceKind,
    reader: BufReader<File>,
    line_buffer: String,
    line_num: usize,
    /// Raw records emitted since the last reset.
    emitted: u64,
    num_req: Option<u64>,
    sampler: Option<SpatialSampler>,
}

impl FileTraceReader {
    /// Open a trace file. `num_req` caps the raw records per pass.
    pub fn open<P: AsRef<Path>>(path: P, kind: TraceKind, num_req: Option<u64>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        Ok(Self {
            path,
            kind,
            reader: BufReader::with_capacity(1 << 20, file),
            line_buffer: String::with_capacity(256),
            line_num: 0,
            emitted: 0,
            num_req,
            sampler: None,
        })
    }

    /// Path of the underlying trace file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Parse one line; `Ok(None)` for lines to skip.
    fn parse_line(kind: TraceKind, line: &str, line_num: usize) -> Result<Option<Request>> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(None);
        }
        match kind {
            TraceKind::Csv => Self::parse_csv_line(line, line_num),
            TraceKind::Txt => Self::parse_txt_line(line, line_num),
        }
    }

    fn parse_csv_line(line: &str, line_num: usize) -> Result<Option<Request>> {
        // header row
        if line_num == 0 && line.contains("obj_id") {
            return Ok(None);
        }
        let mut parts = line.splitn(4, ',');
        let ts_str = parts
            .next()
            .ok_or_else(|| Error::Parse(format!("line {}: missing timestamp", line_num + 1)))?;
        let time = ts_str.trim().parse::<u64>().map_err(|_| {
            Error::Parse(format!("line {}: invalid timestamp `{ts_str}`", line_num + 1))
        })?;
        let id_str = parts
            .next()
            .ok_or_else(|| Error::Parse(format!("line {}: missing obj_id", line_num + 1)))?;
        let obj_id = id_str.trim().parse::<u64>().map_err(|_| {
            Error::Parse(format!("line {}: invalid obj_id `{id_str}`", line_num + 1))
        })?;
        let size_str = parts
            .next()
            .ok_or_else(|| Error::Parse(format!("line {}: missing obj_size", line_num + 1)))?;
        let obj_size = size_str.trim().parse::<u64>().map_err(|_| {
            Error::Parse(format!("line {}: invalid obj_size `{size_str}`", line_num + 1))
        })?;
        Ok(Some(Request::new(time, obj_id, obj_size)))
    }

    fn parse_txt_line(line: &str, line_num: usize) -> Result<Option<Request>> {
        let mut parts = line.split_ascii_whitespace();
        let id_str = parts
            .next()
            .ok_or_else(|| Error::Parse(format!("line {}: missing obj_id", line_num + 1)))?;
        let obj_id = id_str.parse::<u64>().map_err(|_| {
            Error::Parse(format!("line {}: invalid obj_id `{id_str}`", line_num + 1))
        })?;
        let obj_size = match parts.next() {
            Some(s) => s.parse::<u64>().map_err(|_| {
                Error::Parse(format!("line {}: invalid obj_size `{s}`", line_num + 1))
            })?,
            None => 1,
        };
        Ok(Some(Request::new(line_num as u64 + 1, obj_id, obj_size)))
    }
}

impl TraceReader for FileTraceReader {
    fn read_next(&mut self) -> Result<Option<Request>> {
        loop {
            if let Some(cap) = self.num_req {
                if self.emitted >= cap {
                    return Ok(None);
                }
            }
            self.line_buffer.clear();
            let n = self.reader.read_line(&mut self.line_buffer)?;
            if n == 0 {
                return Ok(None);
            }
            let line_num = self.line_num;
            self.line_num += 1;
            let Some(req) = Self::parse_line(self.kind, &self.line_buffer, line_num)? else {
                continue;
            };
            self.emitted += 1;
            match &self.sampler {
                Some(s) if !s.sample(req.obj_id) => {}
                _ => return Ok(Some(req)),
            }
        }
    }

    fn reset(&mut self) -> Result<()> {
        let file = File::open(&self.path)?;
        self.reader = BufReader::with_capacity(1 << 20, file);
        self.line_num = 0;
        self.emitted = 0;
        Ok(())
    }

    fn install_spatial_sampler(&mut self, sampler: SpatialSampler) {
        self.sampler = Some(sampler);
    }
}
