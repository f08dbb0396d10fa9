use crate::collectors::iostat::{self, ColumnLayout, Markers, StatsSource};
use crate::models::registry::DeviceRegistry;
use crate::util::interrupt::Interrupt;
use crate::util::report::{self, ReportFormat};
use anyhow::{Context, Result};
use std::io::Write;
use tracing::{debug, info};

// ── Options ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub layout:     ColumnLayout,
    pub markers:    Markers,
    pub format:     ReportFormat,
    /// Print a local timestamp before each report
    pub timestamps: bool,
    /// Stop after this many reports; None = until interrupted
    pub count:      Option<u64>,
}

// ── Refresh loop ──────────────────────────────────────────────────────

/// Where the loop is within one cycle.
#[derive(Debug)]
enum Phase {
    /// Waiting on the statistics source for one sampling window.
    Sampling,
    /// Holding one raw sample to reset, apply and render.
    Reporting(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// `count` reports were written.
    Completed(u64),
    /// SIGINT/SIGTERM observed; the pending sample (if any) was discarded.
    Interrupted,
}

pub struct App<S, W> {
    registry:  DeviceRegistry,
    source:    S,
    out:       W,
    opts:      RunOptions,
    interrupt: Interrupt,
    cycles:    u64,
}

impl<S: StatsSource, W: Write> App<S, W> {
    pub fn new(registry: DeviceRegistry, source: S, out: W, opts: RunOptions, interrupt: Interrupt) -> Self {
        Self { registry, source, out, opts, interrupt, cycles: 0 }
    }

    /// Drive Sampling → Reporting → Sampling until interrupted, until
    /// `count` reports were written, or until a source fails.
    pub fn run(&mut self) -> Result<Outcome> {
        let mut phase = Phase::Sampling;
        loop {
            phase = match phase {
                Phase::Sampling => {
                    if self.interrupt.is_set() {
                        return Ok(Outcome::Interrupted);
                    }
                    if self.opts.count.is_some_and(|n| self.cycles >= n) {
                        return Ok(Outcome::Completed(self.cycles));
                    }
                    let sample = self.source.sample();
                    // A Ctrl-C also kills the child, so check before judging the result.
                    if self.interrupt.is_set() {
                        return Ok(Outcome::Interrupted);
                    }
                    Phase::Reporting(sample?)
                }
                Phase::Reporting(text) => {
                    self.report(&text)?;
                    Phase::Sampling
                }
            };
        }
    }

    fn report(&mut self, text: &str) -> Result<()> {
        let sample = iostat::parse(text, &self.opts.layout, &self.opts.markers);
        self.registry.reset_all();
        let updated = self.registry.apply_sample(&sample);
        self.cycles += 1;
        debug!(cycle = self.cycles, rows = sample.len(), updated, "sample applied");
        if updated == 0 && self.cycles == 1 {
            info!("first sample matched no known device");
        }

        let ts = self.opts.timestamps
            .then(|| chrono::Local::now().format("%m/%d/%Y %I:%M:%S %p").to_string());
        report::write_report(&mut self.out, &self.registry, self.opts.format, ts.as_deref())
            .context("error writing report")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collectors::{multipath, SourceError};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicBool, Ordering};

    const TOPOLOGY: &str = "\
mpatha (3600508b4000156d700012000000b0000) dm-3 HP,HSV210
size=10G features='1 queue_if_no_path' hwhandler='0' wp=rw
`-+- policy='service-time 0' prio=1 status=active
  `- 1:0:0:1 sda 8:0 active ready running
";

    const BUSY: &str = "\
Device:         rrqm/s   wrqm/s     r/s     w/s    rkB/s    wkB/s avgrq-sz avgqu-sz   await  svctm  %util
sda               0.00     0.00    8.00    0.00  4096.00     0.00  1024.00     0.04    4.88   4.88   3.90
dm-3              0.00     0.00    8.00    0.00  4096.00     0.00  1024.00     0.04    4.88   4.88   3.90
";

    const IDLE_MAPPER: &str = "\
Device:         rrqm/s   wrqm/s     r/s     w/s    rkB/s    wkB/s avgrq-sz avgqu-sz   await  svctm  %util
sda               0.00     0.00    8.00    0.00  4096.00     0.00  1024.00     0.04    4.88   4.88   3.90
dm-3              0.00     0.00    0.00    0.00     0.00     0.00     0.00     0.00    0.00   0.00   0.00
";

    struct FakeStats {
        samples:   VecDeque<Result<String, SourceError>>,
        interrupt: Option<&'static AtomicBool>,
        calls:     usize,
    }

    impl FakeStats {
        fn new(samples: &[&str]) -> Self {
            Self { samples: samples.iter().map(|s| Ok(s.to_string())).collect(), interrupt: None, calls: 0 }
        }
    }

    impl StatsSource for FakeStats {
        fn sample(&mut self) -> Result<String, SourceError> {
            self.calls += 1;
            if let Some(flag) = self.interrupt {
                flag.store(true, Ordering::SeqCst);
            }
            self.samples.pop_front().unwrap_or_else(|| Ok(String::new()))
        }
    }

    fn registry() -> DeviceRegistry {
        DeviceRegistry::initialize(multipath::parse(TOPOLOGY, "dm-"))
    }

    fn flag(set: bool) -> &'static AtomicBool {
        Box::leak(Box::new(AtomicBool::new(set)))
    }

    fn never() -> Interrupt {
        Interrupt::new(flag(false))
    }

    impl Default for RunOptions {
        fn default() -> Self {
            Self {
                layout:     ColumnLayout::default(),
                markers:    Markers::default(),
                format:     ReportFormat::Text,
                timestamps: false,
                count:      None,
            }
        }
    }

    fn opts(count: u64) -> RunOptions {
        RunOptions { count: Some(count), ..RunOptions::default() }
    }

    fn rows(out: &[u8]) -> Vec<Vec<String>> {
        String::from_utf8_lossy(out)
            .lines()
            .map(|l| l.split_whitespace().map(String::from).collect())
            .collect()
    }

    #[test]
    fn busy_mapper_renders_with_its_path() {
        let mut out = Vec::new();
        let mut app = App::new(registry(), FakeStats::new(&[BUSY]), &mut out, opts(1), never());
        assert_eq!(app.run().unwrap(), Outcome::Completed(1));

        let rows = rows(&out);
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0][0], "Device");
        assert_eq!(rows[1], ["mpatha", "8.00", "0.00", "4096.00", "0.00", "4.88"]);
        assert_eq!(rows[2], ["|-", "sda", "8.00", "0.00", "4096.00", "0.00", "4.88"]);
        assert!(rows[3].is_empty());
    }

    #[test]
    fn idle_mapper_hides_its_paths() {
        let mut out = Vec::new();
        let mut app = App::new(registry(), FakeStats::new(&[IDLE_MAPPER]), &mut out, opts(1), never());
        app.run().unwrap();
        let rows = rows(&out);
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().flatten().all(|f| f != "mpatha" && f != "sda"));
    }

    #[test]
    fn device_missing_from_next_sample_drops_to_zero() {
        let mut out = Vec::new();
        let next = "dm-3 0.00 0.00 2.00 0.00 8.00 0.00 0.00 0.00 1.00\n";
        let mut app = App::new(registry(), FakeStats::new(&[BUSY, next]), &mut out, opts(2), never());
        assert_eq!(app.run().unwrap(), Outcome::Completed(2));

        let sda = app.registry.paths_of("dm-3").next().unwrap();
        assert_eq!(sda.metrics, Default::default());
        assert_eq!(app.registry.mappers()[0].metrics.reads, 2.0);
        let rows = rows(&out);
        assert_eq!(rows[6], ["|-", "sda", "0.00", "0.00", "0.00", "0.00", "0.00"]);
    }

    #[test]
    fn interrupt_during_sampling_discards_sample() {
        let stop = flag(false);
        let mut src = FakeStats::new(&[BUSY]);
        src.interrupt = Some(stop);
        let mut out = Vec::new();
        let mut app = App::new(registry(), src, &mut out, RunOptions::default(), Interrupt::new(stop));
        assert_eq!(app.run().unwrap(), Outcome::Interrupted);
        assert!(out.is_empty());
    }

    #[test]
    fn interrupt_before_first_cycle_skips_sampling() {
        let mut out = Vec::new();
        let mut app = App::new(registry(), FakeStats::new(&[BUSY]), &mut out, RunOptions::default(), Interrupt::new(flag(true)));
        assert_eq!(app.run().unwrap(), Outcome::Interrupted);
        assert_eq!(app.source.calls, 0);
    }

    #[test]
    fn source_failure_is_fatal_and_names_command() {
        let mut src = FakeStats::new(&[BUSY]);
        src.samples.push_back(Err(SourceError::Spawn {
            command: "iostat -xkyz 1 1".into(),
            source:  std::io::Error::from(std::io::ErrorKind::NotFound),
        }));
        let mut out = Vec::new();
        let mut app = App::new(registry(), src, &mut out, RunOptions::default(), never());
        let err = app.run().unwrap_err();
        assert!(format!("{:#}", err).contains("iostat -xkyz 1 1"));
        assert_eq!(app.cycles, 1);
    }

    #[test]
    fn json_format_emits_one_line_per_cycle() {
        let mut out = Vec::new();
        let opts = RunOptions { format: ReportFormat::Json, timestamps: true, ..opts(2) };
        let mut app = App::new(registry(), FakeStats::new(&[BUSY, IDLE_MAPPER]), &mut out, opts, never());
        app.run().unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<serde_json::Value> = text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["mappers"][0]["paths"][0]["name"], "sda");
        assert!(lines[0]["timestamp"].is_string());
        assert_eq!(lines[1]["mappers"].as_array().unwrap().len(), 0);
    }
}
