//! The Focusing screen (§4.6 state machine: `FOCUSING ──finish──▶ PROCESS`, with a
//! self-loop for repeated jogs).
//!
//! Submits [`CommandEnvelope::GoToFocusLocation`] to the Motion Worker and otherwise only
//! reads the shared telemetry cell — it never touches an instrument port directly, per
//! §5's "the UI MUST NOT call instrument methods directly."

use crate::command::{CommandEnvelope, FocusTag};
use crate::telemetry::TelemetrySnapshot;
use crate::worker::WorkerHandle;
use eframe::egui;

pub enum FocusingOutcome {
    None,
    Finished,
}

pub fn show(ui: &mut egui::Ui, worker: &WorkerHandle, snapshot: &TelemetrySnapshot) -> FocusingOutcome {
    let mut outcome = FocusingOutcome::None;

    ui.heading("Focusing");
    ui.label(if snapshot.busy { "moving..." } else { "idle" });

    ui.horizontal(|ui| {
        if ui.add_enabled(!snapshot.busy, egui::Button::new("Top")).clicked() {
            let _ = worker.submit(CommandEnvelope::GoToFocusLocation(FocusTag::Top));
        }
        if ui.add_enabled(!snapshot.busy, egui::Button::new("Bottom")).clicked() {
            let _ = worker.submit(CommandEnvelope::GoToFocusLocation(FocusTag::Bottom));
        }
        if ui.add_enabled(!snapshot.busy, egui::Button::new("Left")).clicked() {
            let _ = worker.submit(CommandEnvelope::GoToFocusLocation(FocusTag::Left));
        }
        if ui.add_enabled(!snapshot.busy, egui::Button::new("Right")).clicked() {
            let _ = worker.submit(CommandEnvelope::GoToFocusLocation(FocusTag::Right));
        }
        if ui.add_enabled(!snapshot.busy, egui::Button::new("Center")).clicked() {
            let _ = worker.submit(CommandEnvelope::GoToFocusLocation(FocusTag::Center));
        }
    });

    ui.separator();
    ui.label(format!(
        "position: x={:.3} y={:.3} theta={:.3}",
        snapshot.position[0], snapshot.position[1], snapshot.position[2]
    ));

    if ui.button("Finish focusing").clicked() {
        outcome = FocusingOutcome::Finished;
    }

    outcome
}
