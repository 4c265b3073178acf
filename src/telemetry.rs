//! The shared telemetry cell (§3 `TelemetrySnapshot`, §5 concurrency model).
//!
//! The only mutable state shared across the UI and Motion Worker threads. Each field
//! carries its own lock, so a UI poll of one field never blocks the worker from updating
//! another — mirroring the per-property `threading.Lock()` pattern in the source
//! backend's `MotionWorker` state object, rather than one coarse lock over the whole
//! record.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// A point-in-time read of [`Telemetry`] (§3 `TelemetrySnapshot`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    pub busy: bool,
    pub kill_requested: bool,
    pub ring_counter: usize,
    pub rings_total: Option<usize>,
    pub percent_done: f64,
    pub speed: [f64; 3],
    pub position: [f64; 3],
}

/// The shared telemetry cell. `Arc<Telemetry>` is cloned between the UI and Worker.
pub struct Telemetry {
    busy: Mutex<bool>,
    kill_requested: AtomicBool,
    ring_counter: Mutex<usize>,
    rings_total: Mutex<Option<usize>>,
    percent_done: Mutex<f64>,
    speed: [Mutex<f64>; 3],
    position: [Mutex<f64>; 3],
}

impl Default for Telemetry {
    fn default() -> Self {
        Self {
            busy: Mutex::new(false),
            kill_requested: AtomicBool::new(false),
            ring_counter: Mutex::new(0),
            rings_total: Mutex::new(None),
            percent_done: Mutex::new(0.0),
            speed: [Mutex::new(0.0), Mutex::new(0.0), Mutex::new(0.0)],
            position: [Mutex::new(0.0), Mutex::new(0.0), Mutex::new(0.0)],
        }
    }
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            busy: *self.busy.lock().unwrap_or_else(|e| e.into_inner()),
            kill_requested: self.kill_requested.load(Ordering::SeqCst),
            ring_counter: *self.ring_counter.lock().unwrap_or_else(|e| e.into_inner()),
            rings_total: *self.rings_total.lock().unwrap_or_else(|e| e.into_inner()),
            percent_done: *self.percent_done.lock().unwrap_or_else(|e| e.into_inner()),
            speed: [
                *self.speed[0].lock().unwrap_or_else(|e| e.into_inner()),
                *self.speed[1].lock().unwrap_or_else(|e| e.into_inner()),
                *self.speed[2].lock().unwrap_or_else(|e| e.into_inner()),
            ],
            position: [
                *self.position[0].lock().unwrap_or_else(|e| e.into_inner()),
                *self.position[1].lock().unwrap_or_else(|e| e.into_inner()),
                *self.position[2].lock().unwrap_or_else(|e| e.into_inner()),
            ],
        }
    }

    pub fn set_busy(&self, value: bool) {
        *self.busy.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }

    pub fn request_kill(&self) {
        self.kill_requested.store(true, Ordering::SeqCst);
    }

    pub fn kill_requested(&self) -> bool {
        self.kill_requested.load(Ordering::SeqCst)
    }

    pub fn set_ring_counter(&self, value: usize) {
        *self.ring_counter.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }

    pub fn set_rings_total(&self, value: Option<usize>) {
        *self.rings_total.lock().unwrap_or_else(|e| e.into_inner()) = value;
    }

    pub fn set_speed(&self, axis: usize, value: f64) {
        *self.speed[axis].lock().unwrap_or_else(|e| e.into_inner()) = value;
    }

    /// Sets the position for `axis` (0-indexed). Recomputes `percent_done` whenever
    /// `axis == 2` (the third, rotational axis) and `rings_total` is known, per §3's
    /// invariant: readers always observe a consistent percentage for the most recently
    /// reported axis-3 position.
    pub fn set_position(&self, axis: usize, value: f64) {
        *self.position[axis].lock().unwrap_or_else(|e| e.into_inner()) = value;
        if axis == 2 {
            self.recompute_percent_done(value);
        }
    }

    fn recompute_percent_done(&self, axis3_position: f64) {
        let rings_total = *self.rings_total.lock().unwrap_or_else(|e| e.into_inner());
        let Some(rings_total) = rings_total else {
            return;
        };
        if rings_total == 0 {
            return;
        }
        let ring_counter = *self.ring_counter.lock().unwrap_or_else(|e| e.into_inner());
        let numerator = axis3_position.abs() + (ring_counter as f64 - 1.0) * 360.0;
        let denominator = rings_total as f64 * 360.0;
        let fraction = (numerator / denominator).clamp(0.0, 1.0);
        *self.percent_done.lock().unwrap_or_else(|e| e.into_inner()) = fraction * 100.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_done_matches_formula_after_position_update() {
        let telemetry = Telemetry::new();
        telemetry.set_rings_total(Some(35));
        telemetry.set_ring_counter(1);
        telemetry.set_position(2, 180.0);

        let expected = ((180.0 + 0.0) / (35.0 * 360.0)) * 100.0;
        assert!((telemetry.snapshot().percent_done - expected).abs() < 1e-9);
    }

    #[test]
    fn percent_done_accounts_for_completed_rings() {
        let telemetry = Telemetry::new();
        telemetry.set_rings_total(Some(10));
        telemetry.set_ring_counter(4);
        telemetry.set_position(2, 90.0);

        let expected = ((90.0 + 3.0 * 360.0) / (10.0 * 360.0)) * 100.0;
        assert!((telemetry.snapshot().percent_done - expected).abs() < 1e-9);
    }

    #[test]
    fn percent_done_untouched_until_rings_total_known() {
        let telemetry = Telemetry::new();
        telemetry.set_position(2, 180.0);
        assert_eq!(telemetry.snapshot().percent_done, 0.0);
    }

    #[test]
    fn kill_requested_is_observable_across_the_shared_cell() {
        let telemetry = Telemetry::new();
        assert!(!telemetry.kill_requested());
        telemetry.request_kill();
        assert!(telemetry.kill_requested());
    }
}
