use crate::collectors::{read_capture, run_command, SourceError};
use crate::models::device::IoMetrics;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::debug;

/// Zero-based, whitespace-separated column positions in an `iostat -x` row.
///
/// The defaults follow the classic sysstat layout:
/// ```text
/// Device:  rrqm/s  wrqm/s  r/s  w/s  rkB/s  wkB/s  avgrq-sz  avgqu-sz  await  svctm  %util
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ColumnLayout {
    pub name:       usize,
    pub reads:      usize,
    pub writes:     usize,
    pub kb_read:    usize,
    pub kb_written: usize,
    pub await_ms:   usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self { name: 0, reads: 3, writes: 4, kb_read: 5, kb_written: 6, await_ms: 9 }
    }
}

impl ColumnLayout {
    fn max_index(&self) -> usize {
        [self.name, self.reads, self.writes, self.kb_read, self.kb_written, self.await_ms]
            .into_iter()
            .max()
            .unwrap_or(0)
    }
}

/// Device-name substrings that mark a row worth reading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Markers {
    /// Path devices, e.g. "sd" for sdcl.
    pub block_marker:  String,
    /// Mapper devices, e.g. "dm-" for dm-3.
    pub mapper_marker: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self { block_marker: "sd".into(), mapper_marker: "dm-".into() }
    }
}

impl Markers {
    fn matches(&self, name: &str) -> bool {
        (!self.block_marker.is_empty() && name.contains(self.block_marker.as_str()))
            || (!self.mapper_marker.is_empty() && name.contains(self.mapper_marker.as_str()))
    }
}

/// Parse one iostat report into device name → metrics.
/// Malformed rows are skipped; they never fail the whole sample.
pub fn parse(text: &str, layout: &ColumnLayout, markers: &Markers) -> HashMap<String, IoMetrics> {
    let mut map = HashMap::new();
    let width = layout.max_index() + 1;

    for line in text.lines() {
        let f: Vec<&str> = line.split_whitespace().collect();
        let name = match f.get(layout.name) {
            Some(n) if markers.matches(n) => *n,
            _ => continue,
        };
        if f.len() < width {
            debug!(device = name, fields = f.len(), "short iostat row skipped");
            continue;
        }
        match parse_row(&f, layout) {
            Some(io) => { map.insert(name.to_string(), io); }
            None     => debug!(device = name, "unparsable iostat row skipped"),
        }
    }
    map
}

fn parse_row(f: &[&str], layout: &ColumnLayout) -> Option<IoMetrics> {
    let num = |i: usize| f.get(i)?.parse::<f64>().ok().filter(|v| v.is_finite());
    Some(IoMetrics {
        reads:              num(layout.reads)?,
        writes:             num(layout.writes)?,
        kb_read_per_sec:    num(layout.kb_read)?,
        kb_written_per_sec: num(layout.kb_written)?,
        await_ms:           num(layout.await_ms)?,
    })
}

// ── Sources ───────────────────────────────────────────────────────────

/// Something that blocks for one sampling window and returns one iostat report.
pub trait StatsSource {
    fn sample(&mut self) -> Result<String, SourceError>;
}

impl<T: StatsSource + ?Sized> StatsSource for Box<T> {
    fn sample(&mut self) -> Result<String, SourceError> {
        (**self).sample()
    }
}

/// Runs `iostat -xkyz <interval> 1` (or the configured equivalent) once per call.
pub struct IostatCommand {
    argv: Vec<String>,
}

impl IostatCommand {
    /// `base` is the command without the trailing interval/count pair.
    pub fn new(base: &[String], interval_secs: u64) -> Self {
        let mut argv = base.to_vec();
        argv.push(interval_secs.max(1).to_string());
        argv.push("1".to_string());
        Self { argv }
    }

    pub fn argv(&self) -> &[String] { &self.argv }
}

impl StatsSource for IostatCommand {
    fn sample(&mut self) -> Result<String, SourceError> {
        run_command("statistics", &self.argv)
    }
}

/// Replays a captured iostat report from disk.
pub struct CapturedStats {
    path: PathBuf,
}

impl CapturedStats {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl StatsSource for CapturedStats {
    fn sample(&mut self) -> Result<String, SourceError> {
        read_capture(&self.path)
    }
}
