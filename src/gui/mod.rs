//! The primary control surface (§4.6): four screens driven by one [`Application`] value,
//! an `eframe::App` implementation in the teacher's idiom.
//!
//! Grounded on the teacher's `Gui` struct (`src/gui_teacher_ref.rs`): a single struct
//! owning the application handle and toolkit-specific state, with `update` dispatching to
//! per-concern render functions rather than a deep widget hierarchy. The teacher's docked
//! multi-plot layout has no counterpart here — this instrument has one scalar telemetry
//! stream, not a channel-selectable live plot — so the screens below are plain panels
//! instead of an `egui_dock` layout.

pub mod display;
pub mod screens;

use crate::app_config::ApplicationConfig;
use crate::command::CommandEnvelope;
use crate::coordinator::InstrumentCoordinator;
use crate::instrument::laser::LaserPort;
use crate::instrument::motion::MotionPort;
use crate::instrument::shutter::ShutterPort;
use crate::log_capture::LogBuffer;
use crate::settings::Settings;
use crate::worker::{self, WorkerHandle};
use display::{ConfiguredMonitorCatalog, SecondaryDisplay};
use eframe::egui;
use log::error;
use screens::focusing::FocusingOutcome;
use screens::settings::{SettingsDraft, SettingsOutcome};
use screens::start::StartOutcome;
use std::path::PathBuf;
use std::time::Duration;

/// One node of the §4.6 state machine. `Process` covers both its RUNNING and IDLE
/// sub-states, which are read off telemetry rather than tracked here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Start,
    Settings,
    Focusing,
    Process,
}

/// Opens the three real instrument ports and homes the coordinator. Invoked on the Motion
/// Worker thread itself via [`worker::spawn`], never on the UI thread.
fn connect_real(settings: &Settings, timeouts: &crate::app_config::TimeoutSettings) -> crate::error::EocResult<InstrumentCoordinator<LaserPort, ShutterPort, MotionPort>> {
    let laser = LaserPort::open(settings.port_laser())?;
    let shutter = ShutterPort::open(settings.port_shutter())?;
    let motion = MotionPort::open(settings.port_motion_controller())?;
    InstrumentCoordinator::new(
        laser,
        shutter,
        motion,
        Duration::from_millis(timeouts.motion_poll_interval_ms),
        Duration::from_millis(timeouts.motion_stability_window_ms),
    )
}

/// The top-level application value: owns the worker handle, the shared telemetry cell
/// (via the worker), the settings snapshot, the secondary display, and the log tail.
/// Screens borrow it for the duration of their own render call and never store each
/// other (§9 design notes: one-way borrow replaces the source's cyclic screen/app refs).
pub struct Application {
    screen: Screen,
    settings: Settings,
    settings_dir: PathBuf,
    config: ApplicationConfig,
    log_buffer: LogBuffer,
    worker: WorkerHandle,
    display: SecondaryDisplay,
    draft: SettingsDraft,
    settings_error: Option<String>,
    last_error: Option<String>,
}

impl Application {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        settings: Settings,
        settings_dir: PathBuf,
        config: ApplicationConfig,
        log_buffer: LogBuffer,
        monitor_index: usize,
    ) -> crate::error::EocResult<Self> {
        let catalog = ConfiguredMonitorCatalog {
            monitor_count: config.display.monitor_count,
        };
        let display = SecondaryDisplay::new(monitor_index, config.display.monitor_width_px, &catalog)?;
        let frame_sink = display.frame_sink();

        let timeouts = config.timeouts.clone();
        let worker_settings = settings.clone();
        let worker = worker::spawn(
            move || connect_real(&worker_settings, &timeouts),
            settings.clone(),
            config.chirp_form,
            config.timeouts.clone(),
            config.command_channel_capacity,
            config.error_channel_capacity,
            frame_sink,
        );

        let draft = SettingsDraft::from_settings(&settings);

        Ok(Self {
            screen: Screen::Start,
            settings,
            settings_dir,
            config,
            log_buffer,
            worker,
            display,
            draft,
            settings_error: None,
            last_error: None,
        })
    }

    fn poll_errors(&mut self) {
        if let Some(err) = self.worker.try_recv_error() {
            error!("worker reported: {err}");
            self.last_error = Some(err.to_string());
            self.screen = Screen::Start;
        }
    }
}

impl eframe::App for Application {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_errors();

        let snapshot = self.worker.telemetry().snapshot();
        let catalog = ConfiguredMonitorCatalog {
            monitor_count: self.config.display.monitor_count,
        };
        self.display.update(ctx, self.config.display.monitor_width_px, &catalog);

        egui::TopBottomPanel::top("nav").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.selectable_value(&mut self.screen, Screen::Start, "Start");
                ui.selectable_value(&mut self.screen, Screen::Settings, "Settings");
                ui.selectable_value(&mut self.screen, Screen::Focusing, "Focusing");
                ui.selectable_value(&mut self.screen, Screen::Process, "Process");
            });
            if let Some(message) = &self.last_error {
                ui.colored_label(egui::Color32::RED, message.as_str());
            }
        });

        egui::CentralPanel::default().show(ctx, |ui| match self.screen {
            Screen::Start => match screens::start::show(ui, &self.log_buffer) {
                StartOutcome::None => {}
                StartOutcome::GoToFocusing => self.screen = Screen::Focusing,
                StartOutcome::GoToSettings => {
                    self.draft = SettingsDraft::from_settings(&self.settings);
                    self.settings_error = None;
                    self.screen = Screen::Settings;
                }
            },
            Screen::Settings => match screens::settings::show(ui, &mut self.draft, &mut self.settings_error) {
                SettingsOutcome::None => {}
                SettingsOutcome::Applied => match self.draft.apply(&mut self.settings) {
                    Ok(()) => {
                        if let Err(e) = self.settings.save(&self.settings_dir) {
                            self.settings_error = Some(e.to_string());
                        } else {
                            self.settings_error = None;
                            self.screen = Screen::Start;
                        }
                    }
                    Err(message) => self.settings_error = Some(message),
                },
                SettingsOutcome::Cancelled => {
                    self.draft = SettingsDraft::from_settings(&self.settings);
                    self.settings_error = None;
                    self.screen = Screen::Start;
                }
            },
            Screen::Focusing => match screens::focusing::show(ui, &self.worker, &snapshot) {
                FocusingOutcome::None => {}
                FocusingOutcome::Finished => self.screen = Screen::Process,
            },
            Screen::Process => screens::process::show(ui, &self.worker, &snapshot),
        });

        ctx.request_repaint_after(Duration::from_millis(self.config.timeouts.ui_poll_interval_ms));
    }
}

impl Drop for Application {
    /// §4.6: closing the primary window sets `kill_requested` and winds the worker down
    /// cleanly, implemented as a `Drop` rather than `eframe::App::on_exit` so it also
    /// covers the headless/test paths that never enter the `eframe` event loop.
    fn drop(&mut self) {
        self.worker.request_kill();
        let _ = self.worker.submit(CommandEnvelope::CloseConnection);
        self.worker.join();
    }
}
