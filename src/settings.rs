//! The Settings Store (§4.2): a validated, JSON-persistable parameter set for one sine
//! phase plate run.
//!
//! Grounded directly on the `Settings` class in the source program (`sine_phase_plate_backend.py`):
//! private fields behind getters/setters that assert range invariants at the boundary,
//! and a `read_from_json`/`write_to_json` pair against a single fixed filename. Unlike
//! [`crate::app_config::ApplicationConfig`], this is intentionally not routed through the
//! `config`/`figment` layering — the spec requires per-field range validation, not
//! declarative schema validation, and a malformed file here is a user-visible error, not
//! a tolerated default.

use crate::error::{EocError, EocResult};
use crate::validation::is_in_range;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const SETTINGS_FILENAME: &str = "settings.json";

/// The on-disk / persistable subset of [`Settings`] (§6: "excluding the runtime-only
/// `radius_mm` and `focal_length_mm`").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
struct PersistedSettings {
    exposure_time_s: f64,
    grating_width_um: f64,
    grating_height_um: f64,
    wavelength_nm: f64,
    laser_power_mw: f64,
    y_min: u8,
    y_peak_to_peak: u8,
    center_point_x_mm: f64,
    center_point_y_mm: f64,
    port_laser: String,
    port_motion_controller: String,
    port_shutter: String,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            exposure_time_s: 11.0,
            grating_width_um: 70.0,
            grating_height_um: 40.0,
            wavelength_nm: 633.0,
            laser_power_mw: 150.0,
            y_min: 0,
            y_peak_to_peak: 128,
            center_point_x_mm: 4.91,
            center_point_y_mm: 16.51,
            port_laser: "/dev/ttyUSB0".to_string(),
            port_motion_controller: "/dev/ttyUSB1".to_string(),
            port_shutter: "/dev/ttyUSB2".to_string(),
        }
    }
}

/// The full validated parameter set for one run (§3).
///
/// `radius_mm` and `focal_length_mm` are runtime-only: they are never persisted, and are
/// `None` until the operator enters them on the Settings screen for the current sample.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    radius_mm: Option<f64>,
    focal_length_mm: Option<f64>,
    persisted: PersistedSettings,
    /// The minimum admissible exposure time, supplied by [`crate::app_config::ApplicationConfig`]
    /// rather than hard-coded, per the spec's Open Questions.
    minimum_exposure_time_s: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            radius_mm: None,
            focal_length_mm: None,
            persisted: PersistedSettings::default(),
            minimum_exposure_time_s: 11.0,
        }
    }
}

impl Settings {
    /// Constructs defaults with an explicit minimum exposure time floor.
    pub fn with_minimum_exposure_time(minimum_exposure_time_s: f64) -> Self {
        Self {
            minimum_exposure_time_s,
            ..Self::default()
        }
    }

    // --- runtime-only fields -------------------------------------------------------

    pub fn radius_mm(&self) -> Option<f64> {
        self.radius_mm
    }

    pub fn set_radius_mm(&mut self, value: f64) -> EocResult<()> {
        if value >= 0.0 {
            self.radius_mm = Some(value);
            Ok(())
        } else {
            Err(EocError::Validation("radius_mm must be >= 0".into()))
        }
    }

    pub fn focal_length_mm(&self) -> Option<f64> {
        self.focal_length_mm
    }

    pub fn set_focal_length_mm(&mut self, value: f64) -> EocResult<()> {
        if value >= 0.0 {
            self.focal_length_mm = Some(value);
            Ok(())
        } else {
            Err(EocError::Validation("focal_length_mm must be >= 0".into()))
        }
    }

    // --- persisted fields ------------------------------------------------------------

    pub fn exposure_time_s(&self) -> f64 {
        self.persisted.exposure_time_s
    }

    pub fn set_exposure_time_s(&mut self, value: f64) -> EocResult<()> {
        if value >= self.minimum_exposure_time_s {
            self.persisted.exposure_time_s = value;
            Ok(())
        } else {
            Err(EocError::Validation(format!(
                "exposure_time_s must be >= {}",
                self.minimum_exposure_time_s
            )))
        }
    }

    pub fn grating_width_um(&self) -> f64 {
        self.persisted.grating_width_um
    }

    pub fn set_grating_width_um(&mut self, value: f64) -> EocResult<()> {
        if value > 0.0 {
            self.persisted.grating_width_um = value;
            Ok(())
        } else {
            Err(EocError::Validation("grating_width_um must be > 0".into()))
        }
    }

    pub fn grating_height_um(&self) -> f64 {
        self.persisted.grating_height_um
    }

    pub fn set_grating_height_um(&mut self, value: f64) -> EocResult<()> {
        if value > 0.0 {
            self.persisted.grating_height_um = value;
            Ok(())
        } else {
            Err(EocError::Validation("grating_height_um must be > 0".into()))
        }
    }

    pub fn wavelength_nm(&self) -> f64 {
        self.persisted.wavelength_nm
    }

    pub fn set_wavelength_nm(&mut self, value: f64) -> EocResult<()> {
        if value > 0.0 {
            self.persisted.wavelength_nm = value;
            Ok(())
        } else {
            Err(EocError::Validation("wavelength_nm must be > 0".into()))
        }
    }

    pub fn laser_power_mw(&self) -> f64 {
        self.persisted.laser_power_mw
    }

    pub fn set_laser_power_mw(&mut self, value: f64) -> EocResult<()> {
        is_in_range(value, 30.0..=300.0)
            .map_err(|e| EocError::Validation(format!("laser_power_mW: {e}")))?;
        self.persisted.laser_power_mw = value;
        Ok(())
    }

    pub fn y_min(&self) -> u8 {
        self.persisted.y_min
    }

    pub fn set_y_min(&mut self, value: u8) -> EocResult<()> {
        // u8 is already 0..=255; accepted unconditionally, kept as a setter for symmetry
        // with the source's property and to leave room for a narrower future range.
        self.persisted.y_min = value;
        Ok(())
    }

    pub fn y_peak_to_peak(&self) -> u8 {
        self.persisted.y_peak_to_peak
    }

    pub fn set_y_peak_to_peak(&mut self, value: u8) -> EocResult<()> {
        self.persisted.y_peak_to_peak = value;
        Ok(())
    }

    pub fn center_point_x_mm(&self) -> f64 {
        self.persisted.center_point_x_mm
    }

    pub fn set_center_point_x_mm(&mut self, value: f64) -> EocResult<()> {
        is_in_range(value, 0.0..=25.0)
            .map_err(|e| EocError::Validation(format!("center_point_x_mm: {e}")))?;
        self.persisted.center_point_x_mm = value;
        Ok(())
    }

    pub fn center_point_y_mm(&self) -> f64 {
        self.persisted.center_point_y_mm
    }

    pub fn set_center_point_y_mm(&mut self, value: f64) -> EocResult<()> {
        is_in_range(value, 0.0..=25.0)
            .map_err(|e| EocError::Validation(format!("center_point_y_mm: {e}")))?;
        self.persisted.center_point_y_mm = value;
        Ok(())
    }

    pub fn port_laser(&self) -> &str {
        &self.persisted.port_laser
    }

    pub fn set_port_laser(&mut self, value: impl Into<String>) {
        self.persisted.port_laser = value.into();
    }

    pub fn port_motion_controller(&self) -> &str {
        &self.persisted.port_motion_controller
    }

    pub fn set_port_motion_controller(&mut self, value: impl Into<String>) {
        self.persisted.port_motion_controller = value.into();
    }

    pub fn port_shutter(&self) -> &str {
        &self.persisted.port_shutter
    }

    pub fn set_port_shutter(&mut self, value: impl Into<String>) {
        self.persisted.port_shutter = value.into();
    }

    // --- persistence -------------------------------------------------------------

    /// Loads settings from `settings.json` in `dir`. A missing file writes and keeps
    /// defaults (matching the source's `except FileNotFoundError: self.write_to_json()`);
    /// a malformed file is a user-visible error.
    pub fn load(dir: &Path) -> EocResult<Self> {
        let path = dir.join(SETTINGS_FILENAME);
        match fs::read_to_string(&path) {
            Ok(contents) => {
                let persisted: PersistedSettings = serde_json::from_str(&contents)?;
                Ok(Self {
                    radius_mm: None,
                    focal_length_mm: None,
                    persisted,
                    minimum_exposure_time_s: 11.0,
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let settings = Self::default();
                settings.save(dir)?;
                Ok(settings)
            }
            Err(e) => Err(EocError::Io(e)),
        }
    }

    /// Serializes the persistable fields to `settings.json` in `dir`.
    pub fn save(&self, dir: &Path) -> EocResult<()> {
        let path = dir.join(SETTINGS_FILENAME);
        let json = serde_json::to_string_pretty(&self.persisted)?;
        fs::write(path, json)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_writes_and_keeps_defaults() {
        let dir = tempdir().unwrap();
        let settings = Settings::load(dir.path()).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(dir.path().join(SETTINGS_FILENAME).exists());
    }

    #[test]
    fn round_trip_preserves_persisted_fields() {
        let dir = tempdir().unwrap();
        let mut settings = Settings::default();
        settings.set_exposure_time_s(42.0).unwrap();
        settings.set_laser_power_mw(200.0).unwrap();
        settings.set_port_laser("/dev/ttyUSB7");
        settings.save(dir.path()).unwrap();

        let reloaded = Settings::load(dir.path()).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn laser_power_out_of_range_is_rejected_and_value_unchanged() {
        let mut settings = Settings::default();
        let before = settings.laser_power_mw();
        assert!(settings.set_laser_power_mw(10.0).is_err());
        assert_eq!(settings.laser_power_mw(), before);
    }

    #[test]
    fn exposure_time_below_minimum_is_rejected() {
        let mut settings = Settings::with_minimum_exposure_time(11.0);
        assert!(settings.set_exposure_time_s(10.9).is_err());
        assert!(settings.set_exposure_time_s(11.0).is_ok());
    }

    #[test]
    fn center_point_out_of_range_is_rejected() {
        let mut settings = Settings::default();
        assert!(settings.set_center_point_x_mm(26.0).is_err());
        assert!(settings.set_center_point_y_mm(-1.0).is_err());
    }

    #[test]
    fn malformed_file_is_a_user_visible_error() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(SETTINGS_FILENAME), "{not json}").unwrap();
        assert!(Settings::load(dir.path()).is_err());
    }
}
