//! Application-level configuration: how the process runs, as opposed to what science it
//! runs (that's [`crate::settings::Settings`]).
//!
//! Loaded from an optional `config.toml` via the `config` crate, mirroring the source
//! daemon's `ApplicationSettings` — defaults are baked in via `Default`, and an absent file
//! is not an error, unlike a malformed [`crate::settings::Settings`] JSON document.

use config::Config;
use serde::{Deserialize, Serialize};

/// Per-device serial timeouts and worker polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimeoutSettings {
    /// Read timeout for all three instrument ports, per §4.1.
    pub serial_read_timeout_ms: u64,
    /// Interval between `wait_for_movement` status polls.
    pub motion_poll_interval_ms: u64,
    /// Window over which the motion-stopped condition must hold before
    /// `wait_for_movement` returns, per §4.4.
    pub motion_stability_window_ms: u64,
    /// Telemetry tick cadence while a ring is exposing, per §4.5.
    pub telemetry_tick_interval_ms: u64,
    /// UI polling cadence for telemetry and the error queue, per §5.
    pub ui_poll_interval_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            serial_read_timeout_ms: 500,
            motion_poll_interval_ms: 100,
            motion_stability_window_ms: 300,
            telemetry_tick_interval_ms: 500,
            ui_poll_interval_ms: 500,
        }
    }
}

/// The chirp-phase argument convention used by the frame synthesizer.
///
/// The source program wraps an already-radian quantity in `math.radians(...)`, which the
/// spec calls out as a probable bug (§9 Open Questions). Both forms are kept available
/// behind this setting rather than silently "fixed", since nobody has validated either
/// against a measured fringe period since the port.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ChirpForm {
    /// `pi * r^2 / (f * lambda)` — the physically intended argument.
    #[default]
    Radians,
    /// The literal source transcription: `radians(pi * r^2 / (f * lambda))`, i.e. the
    /// radian argument is treated as degrees and converted back, slowing the chirp by a
    /// factor of `180/pi`.
    LegacyDoubleConversion,
}

/// Minimum number of detected display devices required to open the SLM viewport at a
/// non-primary index.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DisplaySettings {
    /// Index of the monitor the SLM full-screen viewport opens on.
    pub monitor_index: usize,
    /// Number of monitors the operator has declared present. eframe has no reliable
    /// cross-platform way to enumerate monitors ahead of window creation, so the
    /// operator's layout is configured here rather than auto-detected.
    pub monitor_count: usize,
    /// Width in logical pixels assumed for each monitor when tiling horizontally to
    /// compute the SLM viewport's origin.
    pub monitor_width_px: f32,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            monitor_index: 1,
            monitor_count: 2,
            monitor_width_px: 1920.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplicationConfig {
    pub log_level: String,
    pub timeouts: TimeoutSettings,
    pub display: DisplaySettings,
    pub chirp_form: ChirpForm,
    /// Capacity of the bounded command queue from UI to worker.
    pub command_channel_capacity: usize,
    /// Capacity of the bounded error queue from worker to UI.
    pub error_channel_capacity: usize,
    /// Minimum exposure time accepted by [`crate::settings::Settings::set_exposure_time_s`].
    /// The spec treats the source's hard-coded `11` as a configurable safety minimum,
    /// not a load-bearing physical constant.
    pub minimum_exposure_time_s: f64,
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            timeouts: TimeoutSettings::default(),
            display: DisplaySettings::default(),
            chirp_form: ChirpForm::default(),
            command_channel_capacity: 8,
            error_channel_capacity: 8,
            minimum_exposure_time_s: 11.0,
        }
    }
}

impl ApplicationConfig {
    /// Loads application configuration, layering an optional `config.toml` over built-in
    /// defaults. A missing file is not an error (matches the source's tolerant config
    /// loading); a malformed one is.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let defaults = Self::default();
        let builder = Config::builder().add_source(config::Config::try_from(&defaults)?);

        let builder = match path {
            Some(path) => builder.add_source(config::File::with_name(path).required(false)),
            None => builder.add_source(config::File::with_name("config").required(false)),
        };

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_load_without_a_config_file() {
        let cfg = ApplicationConfig::load(Some("nonexistent-config-file")).unwrap();
        assert_eq!(cfg, ApplicationConfig::default());
    }

    #[test]
    fn default_minimum_exposure_time_matches_spec() {
        assert_eq!(ApplicationConfig::default().minimum_exposure_time_s, 11.0);
    }
}
