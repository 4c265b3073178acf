//! The Settings screen (§4.6 state machine: `SETTINGS ──apply/cancel──▶ START`).
//!
//! Holds its own editable draft rather than mutating [`crate::settings::Settings`] field by
//! field as the operator types, so `Cancel` can discard in-progress edits. `Apply` pushes the
//! draft through the validated setters one field at a time and reports the first failure,
//! matching the source UI's per-field `try/except` validation on the Apply handler.

use crate::settings::Settings;
use eframe::egui;

/// A plain-data mirror of [`Settings`], including the two runtime-only fields the operator
/// enters here for the current sample (§4.2).
pub struct SettingsDraft {
    pub radius_mm: String,
    pub focal_length_mm: String,
    pub exposure_time_s: String,
    pub grating_width_um: String,
    pub grating_height_um: String,
    pub wavelength_nm: String,
    pub laser_power_mw: String,
    pub y_min: String,
    pub y_peak_to_peak: String,
    pub center_point_x_mm: String,
    pub center_point_y_mm: String,
    pub port_laser: String,
    pub port_motion_controller: String,
    pub port_shutter: String,
}

impl SettingsDraft {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            radius_mm: settings.radius_mm().map(|v| v.to_string()).unwrap_or_default(),
            focal_length_mm: settings.focal_length_mm().map(|v| v.to_string()).unwrap_or_default(),
            exposure_time_s: settings.exposure_time_s().to_string(),
            grating_width_um: settings.grating_width_um().to_string(),
            grating_height_um: settings.grating_height_um().to_string(),
            wavelength_nm: settings.wavelength_nm().to_string(),
            laser_power_mw: settings.laser_power_mw().to_string(),
            y_min: settings.y_min().to_string(),
            y_peak_to_peak: settings.y_peak_to_peak().to_string(),
            center_point_x_mm: settings.center_point_x_mm().to_string(),
            center_point_y_mm: settings.center_point_y_mm().to_string(),
            port_laser: settings.port_laser().to_string(),
            port_motion_controller: settings.port_motion_controller().to_string(),
            port_shutter: settings.port_shutter().to_string(),
        }
    }

    /// Applies every field through its validated setter, stopping at the first failure so
    /// the error message names the offending field. On success the caller still owns
    /// persisting the result via [`Settings::save`].
    pub fn apply(&self, settings: &mut Settings) -> Result<(), String> {
        let parse = |label: &str, value: &str| -> Result<f64, String> {
            value.trim().parse::<f64>().map_err(|_| format!("{label}: not a number"))
        };

        if !self.radius_mm.trim().is_empty() {
            settings
                .set_radius_mm(parse("radius_mm", &self.radius_mm)?)
                .map_err(|e| e.to_string())?;
        }
        if !self.focal_length_mm.trim().is_empty() {
            settings
                .set_focal_length_mm(parse("focal_length_mm", &self.focal_length_mm)?)
                .map_err(|e| e.to_string())?;
        }
        settings
            .set_exposure_time_s(parse("exposure_time_s", &self.exposure_time_s)?)
            .map_err(|e| e.to_string())?;
        settings
            .set_grating_width_um(parse("grating_width_um", &self.grating_width_um)?)
            .map_err(|e| e.to_string())?;
        settings
            .set_grating_height_um(parse("grating_height_um", &self.grating_height_um)?)
            .map_err(|e| e.to_string())?;
        settings
            .set_wavelength_nm(parse("wavelength_nm", &self.wavelength_nm)?)
            .map_err(|e| e.to_string())?;
        settings
            .set_laser_power_mw(parse("laser_power_mw", &self.laser_power_mw)?)
            .map_err(|e| e.to_string())?;
        let y_min: u8 = self.y_min.trim().parse().map_err(|_| "y_min: not a byte".to_string())?;
        settings.set_y_min(y_min).map_err(|e| e.to_string())?;
        let y_peak_to_peak: u8 = self
            .y_peak_to_peak
            .trim()
            .parse()
            .map_err(|_| "y_peak_to_peak: not a byte".to_string())?;
        settings.set_y_peak_to_peak(y_peak_to_peak).map_err(|e| e.to_string())?;
        settings
            .set_center_point_x_mm(parse("center_point_x_mm", &self.center_point_x_mm)?)
            .map_err(|e| e.to_string())?;
        settings
            .set_center_point_y_mm(parse("center_point_y_mm", &self.center_point_y_mm)?)
            .map_err(|e| e.to_string())?;
        settings.set_port_laser(self.port_laser.trim());
        settings.set_port_motion_controller(self.port_motion_controller.trim());
        settings.set_port_shutter(self.port_shutter.trim());
        Ok(())
    }
}

/// Outcome of a frame of the Settings screen, consumed by [`crate::gui::Application`] to
/// drive the `apply`/`cancel` transitions back to START.
pub enum SettingsOutcome {
    None,
    Applied,
    Cancelled,
}

pub fn show(ui: &mut egui::Ui, draft: &mut SettingsDraft, error: &mut Option<String>) -> SettingsOutcome {
    let mut outcome = SettingsOutcome::None;

    ui.heading("Settings");
    egui::Grid::new("settings_grid").num_columns(2).show(ui, |ui| {
        ui.label("Radius (mm)");
        ui.text_edit_singleline(&mut draft.radius_mm);
        ui.end_row();

        ui.label("Focal length (mm)");
        ui.text_edit_singleline(&mut draft.focal_length_mm);
        ui.end_row();

        ui.label("Exposure time (s)");
        ui.text_edit_singleline(&mut draft.exposure_time_s);
        ui.end_row();

        ui.label("Grating width (µm)");
        ui.text_edit_singleline(&mut draft.grating_width_um);
        ui.end_row();

        ui.label("Grating height (µm)");
        ui.text_edit_singleline(&mut draft.grating_height_um);
        ui.end_row();

        ui.label("Wavelength (nm)");
        ui.text_edit_singleline(&mut draft.wavelength_nm);
        ui.end_row();

        ui.label("Laser power (mW)");
        ui.text_edit_singleline(&mut draft.laser_power_mw);
        ui.end_row();

        ui.label("y_min");
        ui.text_edit_singleline(&mut draft.y_min);
        ui.end_row();

        ui.label("y_peak_to_peak");
        ui.text_edit_singleline(&mut draft.y_peak_to_peak);
        ui.end_row();

        ui.label("Center X (mm)");
        ui.text_edit_singleline(&mut draft.center_point_x_mm);
        ui.end_row();

        ui.label("Center Y (mm)");
        ui.text_edit_singleline(&mut draft.center_point_y_mm);
        ui.end_row();

        ui.label("Laser port");
        ui.text_edit_singleline(&mut draft.port_laser);
        ui.end_row();

        ui.label("Motion controller port");
        ui.text_edit_singleline(&mut draft.port_motion_controller);
        ui.end_row();

        ui.label("Shutter port");
        ui.text_edit_singleline(&mut draft.port_shutter);
        ui.end_row();
    });

    if let Some(message) = error {
        ui.colored_label(egui::Color32::RED, message.as_str());
    }

    ui.horizontal(|ui| {
        if ui.button("Apply").clicked() {
            outcome = SettingsOutcome::Applied;
        }
        if ui.button("Cancel").clicked() {
            outcome = SettingsOutcome::Cancelled;
        }
    });

    outcome
}
