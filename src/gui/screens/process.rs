//! The Process screen (§4.6 state machine: `PROCESS ──start──▶ RUNNING ──done──▶ IDLE`).
//!
//! RUNNING/IDLE is not a UI-owned state; it is read straight off the telemetry snapshot's
//! `busy` flag, per §5's "RUNNING is observable only via telemetry." The status line,
//! progress indicator, axis-3 angular velocity, and three-axis position mirror §7's
//! user-visible behavior for this screen exactly.

use crate::command::CommandEnvelope;
use crate::telemetry::TelemetrySnapshot;
use crate::worker::WorkerHandle;
use eframe::egui;

pub fn show(ui: &mut egui::Ui, worker: &WorkerHandle, snapshot: &TelemetrySnapshot) {
    ui.heading("Process");
    ui.label(if snapshot.busy { "running" } else { "not running" });

    if let Some(rings_total) = snapshot.rings_total {
        ui.label(format!(
            "{} / {} ({:.1}%)",
            snapshot.ring_counter, rings_total, snapshot.percent_done
        ));
    } else {
        ui.label("no run started yet");
    }

    ui.label(format!("angular velocity (axis 3): {:.3} deg/s", snapshot.speed[2]));
    ui.label(format!(
        "position: x={:.3} y={:.3} theta={:.3}",
        snapshot.position[0], snapshot.position[1], snapshot.position[2]
    ));

    ui.horizontal(|ui| {
        if ui.add_enabled(!snapshot.busy, egui::Button::new("Start")).clicked() {
            let _ = worker.submit(CommandEnvelope::PrintPhasePlate);
        }
        if ui.add_enabled(snapshot.busy, egui::Button::new("Abort")).clicked() {
            worker.request_kill();
        }
    });
}
