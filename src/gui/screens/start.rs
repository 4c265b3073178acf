//! The Start screen (§4.6 state machine: `START ──apply──▶ FOCUSING`, `START
//! ──settings──▶ SETTINGS`).
//!
//! Shows a live tail of the shared [`LogBuffer`] (§10 ambient stack) so the operator can
//! see ambient activity before committing to a run, plus the two entry points into the
//! rest of the state machine.

use crate::log_capture::LogBuffer;
use eframe::egui;

pub enum StartOutcome {
    None,
    GoToFocusing,
    GoToSettings,
}

pub fn show(ui: &mut egui::Ui, log_buffer: &LogBuffer) -> StartOutcome {
    let mut outcome = StartOutcome::None;

    ui.heading("Sine Phase Plate Exposure Orchestration Core");

    ui.horizontal(|ui| {
        if ui.button("Settings").clicked() {
            outcome = StartOutcome::GoToSettings;
        }
        if ui.button("Apply").clicked() {
            outcome = StartOutcome::GoToFocusing;
        }
    });

    ui.separator();
    ui.label("Log");
    egui::ScrollArea::vertical().max_height(240.0).stick_to_bottom(true).show(ui, |ui| {
        for entry in log_buffer.read().iter() {
            ui.colored_label(
                entry.color(),
                format!("[{:>8.3}s] {} {}: {}", entry.elapsed.as_secs_f64(), entry.level, entry.target, entry.message),
            );
        }
    });

    outcome
}
