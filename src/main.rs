mod app;
mod collectors;
mod config;
mod models;
mod util;

use anyhow::{Context, Result};
use app::{App, Outcome, RunOptions};
use clap::Parser;
use collectors::iostat::{CapturedStats, IostatCommand, StatsSource};
use collectors::multipath;
use config::Config;
use models::registry::DeviceRegistry;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;
use util::interrupt::{self, Interrupt};
use util::report::ReportFormat;

#[derive(Parser, Debug)]
#[command(name = "mpathstat", about = "I/O statistics for each multipath device and its paths", version)]
struct Cli {
    /// Sampling window in seconds (overrides the config file)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Stop after this many reports
    #[arg(short, long)]
    count: Option<u64>,

    /// Print a timestamp before each report
    #[arg(short = 't', long)]
    timestamp: bool,

    /// Emit one JSON object per report instead of the table
    #[arg(long)]
    json: bool,

    /// Read `multipath -ll` output from a file instead of running it
    #[arg(long, value_name = "PATH")]
    topology_file: Option<PathBuf>,

    /// Read one `iostat -x` report from a file instead of running it (renders once)
    #[arg(long, value_name = "PATH")]
    stats_file: Option<PathBuf>,

    /// Print config file path and current values, then exit
    #[arg(long)]
    config: bool,

    /// More diagnostics on stderr (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    util::logging::init(cli.verbose);

    let result = run(cli);
    match &result {
        Ok(Outcome::Completed(n)) => info!(reports = n, "done"),
        Ok(Outcome::Interrupted)  => {}
        Err(e)                    => eprintln!("mpathstat: {:#}", e),
    }
    ExitCode::from(exit_code(&result))
}

/// 0 only when a finite `--count` ran to completion.
fn exit_code(result: &Result<Outcome>) -> u8 {
    match result {
        Ok(Outcome::Completed(_)) => 0,
        Ok(Outcome::Interrupted)  => 1,
        Err(_)                    => 1,
    }
}

fn run(cli: Cli) -> Result<Outcome> {
    let cfg = Config::load();
    if cli.config {
        print_config(&cfg);
        return Ok(Outcome::Completed(0));
    }

    interrupt::install().context("error installing signal handlers")?;

    let mapper_marker = cfg.markers.mapper_marker.as_str();
    let topology = match &cli.topology_file {
        Some(path) => multipath::discover_from_file(path, mapper_marker)?,
        None       => multipath::discover(&cfg.sources.topology_command, mapper_marker)?,
    };
    let registry = DeviceRegistry::initialize(topology);

    let interval = cli.interval.unwrap_or(cfg.sampling.interval_secs).max(1);
    let mut opts = RunOptions {
        layout:     cfg.columns.clone(),
        markers:    cfg.markers.clone(),
        format:     if cli.json { ReportFormat::Json } else { ReportFormat::Text },
        timestamps: cli.timestamp,
        count:      cli.count,
    };

    let source: Box<dyn StatsSource> = match &cli.stats_file {
        Some(path) => {
            opts.count = Some(1);
            Box::new(CapturedStats::new(path))
        }
        None => {
            let cmd = IostatCommand::new(&cfg.sources.stats_command, interval);
            info!(command = %cmd.argv().join(" "), "sampling");
            Box::new(cmd)
        }
    };

    let stdout = io::stdout();
    let mut app = App::new(registry, source, stdout.lock(), opts, Interrupt::signal());
    app.run()
}

fn print_config(cfg: &Config) {
    let path = Config::config_path()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_else(|| "(unknown)".to_string());
    let c = &cfg.columns;
    println!("Config: {}", path);
    println!();
    println!("[sources]");
    println!("  topology_command = {}", cfg.sources.topology_command.join(" "));
    println!("  stats_command    = {} <interval> 1", cfg.sources.stats_command.join(" "));
    println!();
    println!("[sampling]");
    println!("  interval_secs = {}", cfg.sampling.interval_secs);
    println!();
    println!("[columns]");
    println!("  name = {}  reads = {}  writes = {}  kb_read = {}  kb_written = {}  await_ms = {}",
        c.name, c.reads, c.writes, c.kb_read, c.kb_written, c.await_ms);
    println!();
    println!("[markers]");
    println!("  block_marker  = {:?}", cfg.markers.block_marker);
    println!("  mapper_marker = {:?}", cfg.markers.mapper_marker);
}
