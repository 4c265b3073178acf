//! Application entry point for the native GUI (and its `--headless` smoke-test mode).
//!
//! Grounded on the teacher's `main.rs` (`src/main_teacher_ref.rs`): custom dual-backend
//! logging set up before anything else, configuration loaded next, then either the
//! `eframe` event loop or (here) a headless run. The teacher combines its console and GUI
//! loggers with the `multi_log` crate; this binary has only two backends and no plugin
//! registries to wire up, so the combination is a small hand-written `log::Log`
//! forwarder instead of pulling in `multi_log` for that alone (see DESIGN.md).

use anyhow::{Context, Result};
use clap::Parser;
use eoc::app_config::ApplicationConfig;
use eoc::command::CommandEnvelope;
use eoc::coordinator::InstrumentCoordinator;
use eoc::gui::display::{FakeMonitorCatalog, SecondaryDisplay};
use eoc::gui::Application;
use eoc::instrument::mock::{MockLaserPort, MockMotionPort, MockShutterPort};
use eoc::log_capture::{LogBuffer, LogCollector};
use eoc::settings::Settings;
use eoc::worker;
use log::{info, Level, LevelFilter, Log, Metadata, Record};
use std::path::PathBuf;
use std::thread::sleep;
use std::time::Duration;

/// Forwards every record to both the console backend and the GUI's in-memory tail,
/// mirroring the teacher's `multi_log::MultiLogger` without the extra dependency.
struct CombinedLogger {
    console: env_logger::Logger,
    collector: LogCollector,
}

impl Log for CombinedLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.console.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        self.console.log(record);
        self.collector.log(record);
    }

    fn flush(&self) {
        self.console.flush();
    }
}

#[derive(Parser, Debug)]
#[command(name = "eoc", about = "Exposure Orchestration Core for sine phase plate fabrication")]
struct Cli {
    /// Path to an optional application config.toml (process-level settings).
    #[arg(long)]
    config: Option<String>,
    /// Directory holding settings.json (domain settings for the current sample).
    #[arg(long)]
    settings: Option<String>,
    /// Run the Motion Worker against a mock instrument stack without opening the GUI.
    #[arg(long)]
    headless: bool,
    /// Overrides the configured secondary-display monitor index.
    #[arg(long)]
    monitor: Option<usize>,
}

fn init_logging(log_level_filter: LevelFilter) -> LogBuffer {
    let log_buffer = LogBuffer::new();
    let collector = LogCollector::new(log_buffer.clone());
    let console = env_logger::Builder::new().filter_level(log_level_filter).build();
    log::set_max_level(log_level_filter);
    let _ = log::set_boxed_logger(Box::new(CombinedLogger { console, collector }));
    log_buffer
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level_filter = std::env::var("RUST_LOG").map_or(LevelFilter::Info, |s| {
        s.parse().unwrap_or(LevelFilter::Info)
    });
    let log_buffer = init_logging(log_level_filter);

    let config = ApplicationConfig::load(cli.config.as_deref()).context("loading application configuration")?;
    info!("Configuration loaded successfully.");

    let settings_dir = PathBuf::from(cli.settings.unwrap_or_else(|| ".".to_string()));
    let settings = Settings::load(&settings_dir).context("loading settings.json")?;
    info!("Settings loaded from {}", settings_dir.display());

    let monitor_index = cli.monitor.unwrap_or(config.display.monitor_index);

    if cli.headless {
        return run_headless(settings, config);
    }

    let options = eframe::NativeOptions::default();
    info!("Starting GUI...");
    eframe::run_native(
        "Exposure Orchestration Core",
        options,
        Box::new(move |_cc| {
            Application::new(settings, settings_dir, config, log_buffer, monitor_index)
                .map(|app| Box::new(app) as Box<dyn eframe::App>)
                .map_err(|e| e.into())
        }),
    )
    .map_err(|e| anyhow::anyhow!("eframe run error: {e}"))?;

    info!("GUI closed.");
    Ok(())
}

/// Runs one full print against an in-memory mock instrument stack with no window, for
/// CI environments without RS-232 hardware or a display attached.
fn run_headless(settings: Settings, config: ApplicationConfig) -> Result<()> {
    let catalog = FakeMonitorCatalog { monitor_count: 1 };
    let display = SecondaryDisplay::new(0, config.display.monitor_width_px, &catalog)
        .context("constructing the headless display sink")?;
    let frame_sink = display.frame_sink();

    let timeouts = config.timeouts.clone();
    let worker_handle = worker::spawn(
        move || {
            InstrumentCoordinator::new(
                MockLaserPort::default(),
                MockShutterPort::default(),
                MockMotionPort::default(),
                Duration::from_millis(timeouts.motion_poll_interval_ms),
                Duration::from_millis(timeouts.motion_stability_window_ms),
            )
        },
        settings,
        config.chirp_form,
        config.timeouts.clone(),
        config.command_channel_capacity,
        config.error_channel_capacity,
        frame_sink,
    );

    worker_handle.submit(CommandEnvelope::PrintPhasePlate)?;

    loop {
        sleep(Duration::from_millis(config.timeouts.ui_poll_interval_ms));
        if let Some(err) = worker_handle.try_recv_error() {
            log::error!("headless run failed: {err}");
            return Err(anyhow::anyhow!(err));
        }
        if !worker_handle.telemetry().snapshot().busy {
            break;
        }
    }

    let mut worker_handle = worker_handle;
    worker_handle.request_kill();
    worker_handle.submit(CommandEnvelope::CloseConnection).ok();
    worker_handle.join();
    info!("Headless run complete.");
    Ok(())
}
