//! hybridfan — Main Entry Point
//!
//! Hexagonal architecture with a single cooperative control loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HostHardware        LogEventSink   JsonConfigFile  Monotonic  │
//! │  (Sensor+Actuator)   (EventSink)    (ConfigPort)    (TimePort) │
//! │  ipmitool · smartctl · lm-sensors                              │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              ControlService (pure logic)               │    │
//! │  │  CPU levels · Storage PID · Overrides · Verification   │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;

use hybridfan::adapters::config_file::JsonConfigFile;
use hybridfan::adapters::hardware::HostHardware;
use hybridfan::adapters::log_sink::LogEventSink;
use hybridfan::adapters::time::MonotonicClock;
use hybridfan::app::ports::ConfigPort;
use hybridfan::app::service::ControlService;
use hybridfan::config::ControllerConfig;
use hybridfan::logging::{DEFAULT_LOG_FILE, init_logging};

#[derive(Parser)]
#[command(name = "hybridfan")]
#[command(about = "Two-zone CPU/storage fan controller", long_about = None)]
struct Args {
    /// JSON configuration file (defaults are used if it does not exist)
    #[arg(long, default_value = "/etc/hybridfan/config.json")]
    config: PathBuf,

    /// Log file (appended)
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Print the default configuration as JSON and exit
    #[arg(long)]
    print_default_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_default_config {
        let json = serde_json::to_string_pretty(&ControllerConfig::default())
            .context("serializing default configuration")?;
        println!("{json}");
        return Ok(());
    }

    // ── 1. Logging (must succeed before the loop starts) ──────
    let _log_guard = init_logging(&args.log_file)
        .with_context(|| format!("opening log file {}", args.log_file.display()))?;

    info!("hybridfan v{} starting", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration ──────────────────────────────────────
    let config = JsonConfigFile::new(&args.config)
        .load()
        .with_context(|| format!("loading configuration {}", args.config.display()))?;
    info!(
        "CPU thresholds {}/{}/{}\u{00b0}C, storage target {}\u{00b0}C (max {}\u{00b0}C), poll {}s",
        config.cpu_low_temp,
        config.cpu_med_temp,
        config.cpu_high_temp,
        config.hd_target_temp,
        config.hd_max_allowed_temp,
        config.hd_polling_interval_secs,
    );

    // ── 3. Adapters ───────────────────────────────────────────
    let mut hw = HostHardware::from_config(&config);
    let mut sink = LogEventSink::new();
    let clock = MonotonicClock::new();

    // ── 4. Control loop (never returns) ───────────────────────
    let mut service = ControlService::new(config);
    service.run_forever(&mut hw, &mut sink, &clock)
}
