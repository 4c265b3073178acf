//! The Motion Worker (§4.5): a single dedicated thread owning the Instrument
//! Coordinator, consuming a bounded command queue, publishing telemetry, and honoring a
//! kill flag.
//!
//! Grounded on the source backend's `MotionControlThread`: a `Thread` subclass holding
//! `command_queue`/`error_queue`/`monitor`, whose `run` loop pulls a command, looks it up
//! in `function_map`, and reports exceptions to the error queue. The dynamic
//! `function_map` dispatch becomes the static match in `handle_command` (§9 design
//! notes); `std::sync::mpsc::sync_channel` replaces `queue.Queue` as the bounded
//! producer/consumer primitive, matching the teacher's use of bounded channels between
//! its DAQ actor and callers.

use crate::app_config::{ChirpForm, TimeoutSettings};
use crate::command::{CommandEnvelope, FocusTag};
use crate::coordinator::InstrumentCoordinator;
use crate::error::{EocError, EocResult, InstrumentError};
use crate::gui::display::FrameSink;
use crate::instrument::{LaserDevice, LineProtocol, MotionDevice, ShutterDevice};
use crate::settings::Settings;
use crate::synthesis::{self, derive_ring};
use crate::telemetry::Telemetry;
use log::{error, info, warn};
use std::sync::mpsc::{sync_channel, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often the worker loop polls its command queue while idle, to stay responsive to
/// `kill_requested` between commands.
const COMMAND_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// A live handle to a running Motion Worker thread. Dropping this without calling
/// [`WorkerHandle::join`] detaches the worker; it will still observe `kill_requested`
/// and wind down on its own.
pub struct WorkerHandle {
    command_tx: SyncSender<CommandEnvelope>,
    error_rx: Receiver<InstrumentError>,
    telemetry: Arc<Telemetry>,
    join_handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn submit(&self, command: CommandEnvelope) -> EocResult<()> {
        self.command_tx.send(command).map_err(|_| EocError::QueueClosed)
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Non-blocking poll of the error queue, for the UI's ~500 ms telemetry tick (§5).
    pub fn try_recv_error(&self) -> Option<InstrumentError> {
        match self.error_rx.try_recv() {
            Ok(err) => Some(err),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn request_kill(&self) {
        self.telemetry.request_kill();
    }

    /// Blocks until the worker thread has exited.
    pub fn join(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.join();
        }
    }
}

/// Spawns the Motion Worker thread. `connect` is invoked on the worker thread itself (not
/// here) so instrument port handles are never moved across threads after opening, per
/// §5's "Instrument ports are thread-confined to the Worker."
pub fn spawn<L, S, M, F>(
    connect: F,
    settings: Settings,
    chirp_form: ChirpForm,
    timeouts: TimeoutSettings,
    command_channel_capacity: usize,
    error_channel_capacity: usize,
    frame_sink: FrameSink,
) -> WorkerHandle
where
    L: LaserDevice + 'static,
    S: ShutterDevice + 'static,
    M: MotionDevice + 'static,
    F: FnOnce() -> EocResult<InstrumentCoordinator<L, S, M>> + Send + 'static,
{
    let (command_tx, command_rx) = sync_channel(command_channel_capacity);
    let (error_tx, error_rx) = sync_channel::<InstrumentError>(error_channel_capacity);
    let telemetry = Arc::new(Telemetry::new());
    let worker_telemetry = telemetry.clone();

    let join_handle = thread::spawn(move || {
        let mut coordinator = match connect() {
            Ok(coordinator) => coordinator,
            Err(err) => {
                error!("worker: failed to connect instruments: {err}");
                let _ = error_tx.send(to_instrument_error(err));
                return;
            }
        };

        run_loop(
            &mut coordinator,
            &command_rx,
            &error_tx,
            &worker_telemetry,
            &settings,
            chirp_form,
            &timeouts,
            &frame_sink,
        );

        if let Err(err) = coordinator.stop_movement() {
            warn!("worker: error during shutdown stop: {err}");
        }
        info!("worker: exiting");
    });

    WorkerHandle {
        command_tx,
        error_rx,
        telemetry,
        join_handle: Some(join_handle),
    }
}

fn to_instrument_error(err: EocError) -> InstrumentError {
    match err {
        EocError::Instrument(inner) => inner,
        other => InstrumentError::DeviceError(other.to_string()),
    }
}

#[allow(clippy::too_many_arguments)]
fn run_loop<L, S, M>(
    coordinator: &mut InstrumentCoordinator<L, S, M>,
    command_rx: &Receiver<CommandEnvelope>,
    error_tx: &SyncSender<InstrumentError>,
    telemetry: &Telemetry,
    settings: &Settings,
    chirp_form: ChirpForm,
    timeouts: &TimeoutSettings,
    frame_sink: &FrameSink,
) where
    L: LaserDevice,
    S: ShutterDevice,
    M: MotionDevice,
{
    loop {
        match command_rx.recv_timeout(COMMAND_POLL_INTERVAL) {
            Ok(command) => {
                if matches!(command, CommandEnvelope::CloseConnection) {
                    info!("worker: close connection requested");
                    return;
                }
                handle_command(coordinator, command, error_tx, telemetry, settings, chirp_form, timeouts, frame_sink);
            }
            Err(RecvTimeoutError::Timeout) => {
                if telemetry.kill_requested() {
                    info!("worker: kill observed between commands");
                    return;
                }
            }
            Err(RecvTimeoutError::Disconnected) => {
                info!("worker: command queue closed");
                return;
            }
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn handle_command<L, S, M>(
    coordinator: &mut InstrumentCoordinator<L, S, M>,
    command: CommandEnvelope,
    error_tx: &SyncSender<InstrumentError>,
    telemetry: &Telemetry,
    settings: &Settings,
    chirp_form: ChirpForm,
    timeouts: &TimeoutSettings,
    frame_sink: &FrameSink,
) where
    L: LaserDevice,
    S: ShutterDevice,
    M: MotionDevice,
{
    match command {
        CommandEnvelope::GoToFocusLocation(tag) => with_retry(telemetry, error_tx, || {
            coordinator.go_to_focus_location(tag, settings.center_point_x_mm(), settings.center_point_y_mm())
        }),
        CommandEnvelope::OpenShutter => with_retry(telemetry, error_tx, || coordinator.open_shutter().map(|_| ())),
        CommandEnvelope::CloseShutter => with_retry(telemetry, error_tx, || coordinator.close_shutter().map(|_| ())),
        CommandEnvelope::SendLaserCommand(raw) => {
            with_retry(telemetry, error_tx, || coordinator.send_laser_command(&raw).map(|_| ()))
        }
        CommandEnvelope::PrintPhasePlate => {
            telemetry.set_busy(true);
            if let Err(err) = print_phase_plate(coordinator, settings, chirp_form, timeouts, telemetry, frame_sink) {
                error!("worker: print_phase_plate aborted: {err}");
                let _ = error_tx.send(to_instrument_error(err));
            }
            telemetry.set_busy(false);
        }
        CommandEnvelope::CloseConnection => unreachable!("handled in run_loop"),
    }
}

/// At most two attempts per command (§4.5 retry policy); a repeated failure is the
/// command's outcome on the error queue. `print_phase_plate` never goes through this
/// path — it has its own abort-on-first-failure handling.
fn with_retry(telemetry: &Telemetry, error_tx: &SyncSender<InstrumentError>, mut op: impl FnMut() -> EocResult<()>) {
    telemetry.set_busy(true);
    if let Err(first_err) = op() {
        if matches!(first_err, EocError::Instrument(InstrumentError::InvalidArgument(_))) {
            error!("worker: invalid argument, not retrying: {first_err}");
            let _ = error_tx.send(to_instrument_error(first_err));
            telemetry.set_busy(false);
            return;
        }
        warn!("worker: first attempt failed, retrying: {first_err}");
        if let Err(second_err) = op() {
            error!("worker: second attempt failed: {second_err}");
            let _ = error_tx.send(to_instrument_error(second_err));
        }
    }
    telemetry.set_busy(false);
}

fn tick_telemetry<L, S, M>(coordinator: &mut InstrumentCoordinator<L, S, M>, telemetry: &Telemetry) -> EocResult<()>
where
    L: LaserDevice,
    S: ShutterDevice,
    M: MotionDevice,
{
    for axis in 1..=3u8 {
        let position = coordinator.position(axis)?;
        telemetry.set_position(axis as usize - 1, position);
        let speed = coordinator.velocity(axis)?;
        telemetry.set_speed(axis as usize - 1, speed);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn wait_for_movement_ticking<L, S, M>(
    coordinator: &mut InstrumentCoordinator<L, S, M>,
    telemetry: &Telemetry,
    poll_interval: Duration,
    stability_window: Duration,
    tick_interval: Duration,
) -> EocResult<()>
where
    L: LaserDevice,
    S: ShutterDevice,
    M: MotionDevice,
{
    let mut last_tick = Instant::now()
        .checked_sub(tick_interval)
        .unwrap_or_else(Instant::now);
    loop {
        while coordinator.motion_status()?.iter().any(|&moving| moving) {
            if last_tick.elapsed() >= tick_interval {
                tick_telemetry(coordinator, telemetry)?;
                last_tick = Instant::now();
            }
            thread::sleep(poll_interval);
        }

        let window_start = Instant::now();
        let mut resumed = false;
        while window_start.elapsed() < stability_window {
            if coordinator.motion_status()?.iter().any(|&moving| moving) {
                resumed = true;
                break;
            }
        }
        if !resumed {
            return Ok(());
        }
    }
}

/// §4.5 `print_phase_plate` handler.
fn print_phase_plate<L, S, M>(
    coordinator: &mut InstrumentCoordinator<L, S, M>,
    settings: &Settings,
    chirp_form: ChirpForm,
    timeouts: &TimeoutSettings,
    telemetry: &Telemetry,
    frame_sink: &FrameSink,
) -> EocResult<()>
where
    L: LaserDevice,
    S: ShutterDevice,
    M: MotionDevice,
{
    let radius_mm = settings
        .radius_mm()
        .ok_or_else(|| InstrumentError::InvalidArgument("radius_mm is not set".to_string()))?;
    let focal_length_mm = settings
        .focal_length_mm()
        .ok_or_else(|| InstrumentError::InvalidArgument("focal_length_mm is not set".to_string()))?;

    let frames = synthesis::synthesize(
        radius_mm,
        focal_length_mm,
        settings.wavelength_nm(),
        settings.grating_width_um(),
        settings.y_min(),
        settings.y_peak_to_peak(),
        chirp_form,
    )?;

    telemetry.set_rings_total(Some(frames.len()));
    telemetry.set_ring_counter(1);

    coordinator.go_to_focus_location(FocusTag::Center, settings.center_point_x_mm(), settings.center_point_y_mm())?;

    let grating_width_m = settings.grating_width_um() / 1_000_000.0;
    let grating_height_m = settings.grating_height_um() / 1_000_000.0;

    for (i, frame) in frames.iter().enumerate() {
        frame_sink.thread_safe_show_image(frame.clone());

        let ring = derive_ring(i, grating_width_m, grating_height_m, settings.exposure_time_s());
        coordinator.print_ring(&ring, grating_width_m, settings.laser_power_mw())?;

        wait_for_movement_ticking(
            coordinator,
            telemetry,
            Duration::from_millis(timeouts.motion_poll_interval_ms),
            Duration::from_millis(timeouts.motion_stability_window_ms),
            Duration::from_millis(timeouts.telemetry_tick_interval_ms),
        )?;

        coordinator.close_shutter()?;
        telemetry.set_ring_counter(i + 2);

        if telemetry.kill_requested() {
            coordinator.stop_movement()?;
            coordinator.set_lasing(false)?;
            info!("worker: kill observed mid-run after ring {i}");
            return Ok(());
        }
    }

    coordinator.set_lasing(false)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gui::display::{FakeMonitorCatalog, SecondaryDisplay};
    use crate::instrument::mock::{MockLaserPort, MockMotionPort, MockShutterPort};
    use std::sync::mpsc::sync_channel;

    fn test_coordinator() -> InstrumentCoordinator<MockLaserPort, MockShutterPort, MockMotionPort> {
        InstrumentCoordinator::new(
            MockLaserPort::default(),
            MockShutterPort::default(),
            MockMotionPort::default(),
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
        .unwrap()
    }

    fn s3_settings() -> Settings {
        let mut settings = Settings::default();
        settings.set_radius_mm(2.5).unwrap();
        settings.set_focal_length_mm(30.0).unwrap();
        settings.set_wavelength_nm(633.0).unwrap();
        settings.set_grating_width_um(70.0).unwrap();
        settings.set_grating_height_um(40.0).unwrap();
        settings.set_exposure_time_s(11.0).unwrap();
        settings.set_laser_power_mw(150.0).unwrap();
        settings.set_y_min(65).unwrap();
        settings.set_y_peak_to_peak(85).unwrap();
        settings
    }

    fn fake_frame_sink() -> FrameSink {
        let catalog = FakeMonitorCatalog { monitor_count: 2 };
        let display = SecondaryDisplay::new(1, 1920.0, &catalog).unwrap();
        display.frame_sink()
    }

    #[test]
    fn print_phase_plate_runs_all_rings_and_disables_lasing() {
        let mut coordinator = test_coordinator();
        let telemetry = Telemetry::new();
        let settings = s3_settings();
        let timeouts = TimeoutSettings {
            motion_poll_interval_ms: 0,
            motion_stability_window_ms: 0,
            ..Default::default()
        };
        let sink = fake_frame_sink();

        print_phase_plate(&mut coordinator, &settings, ChirpForm::Radians, &timeouts, &telemetry, &sink).unwrap();

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.rings_total, Some(35));
        assert_eq!(snapshot.ring_counter, 36);
        assert!(!coordinator.laser.lasing);
    }

    #[test]
    fn kill_requested_before_the_run_stops_after_the_first_ring() {
        let mut coordinator = test_coordinator();
        let telemetry = Telemetry::new();
        let settings = s3_settings();
        let timeouts = TimeoutSettings {
            motion_poll_interval_ms: 0,
            motion_stability_window_ms: 0,
            ..Default::default()
        };
        let sink = fake_frame_sink();

        telemetry.request_kill();
        print_phase_plate(&mut coordinator, &settings, ChirpForm::Radians, &timeouts, &telemetry, &sink).unwrap();

        let snapshot = telemetry.snapshot();
        assert_eq!(snapshot.rings_total, Some(35));
        // Ring 0 ran to completion before the kill was observed; no further ring started.
        assert_eq!(snapshot.ring_counter, 2);
        assert!(!coordinator.shutter.open);
        assert!(!coordinator.laser.lasing);
    }

    #[test]
    fn error_retry_posts_exactly_one_error_on_repeated_failure() {
        let mut coordinator = InstrumentCoordinator::new(
            MockLaserPort::default(),
            MockShutterPort::default(),
            MockMotionPort::default(),
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
        .unwrap();
        let telemetry = Telemetry::new();
        let (error_tx, error_rx) = sync_channel(8);

        with_retry(&telemetry, &error_tx, || {
            coordinator.go_to_focus_location(FocusTag::Center, 4.91, 16.51)
        });
        assert!(error_rx.try_recv().is_err());

        with_retry(&telemetry, &error_tx, || {
            Err(InstrumentError::DeviceError("always fails".to_string()).into())
        });
        assert!(error_rx.try_recv().is_ok());
        assert!(error_rx.try_recv().is_err());
    }
}
