//! The Instrument Coordinator (§4.4): composes the three instrument ports into the
//! phased operations the Motion Worker invokes.
//!
//! Grounded on `sine_phase_plate_backend.py`'s `InstrumentController`: construction opens
//! all three ports, verifies each, homes the motion controller, and closes the shutter as
//! a safety default before any other operation is possible.

use crate::command::FocusTag;
use crate::error::{EocError, EocResult, InstrumentError};
use crate::instrument::{LaserDevice, MotionDevice, ShutterDevice};
use crate::synthesis::Ring;
use log::info;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// A fully-awake set of phased instrument operations, generic over the three traits so
/// real and mock devices can both drive it (§8).
pub struct InstrumentCoordinator<L, S, M>
where
    L: LaserDevice,
    S: ShutterDevice,
    M: MotionDevice,
{
    pub(crate) laser: L,
    pub(crate) shutter: S,
    pub(crate) motion: M,
    motion_poll_interval: Duration,
    motion_stability_window: Duration,
}

impl<L, S, M> InstrumentCoordinator<L, S, M>
where
    L: LaserDevice,
    S: ShutterDevice,
    M: MotionDevice,
{
    /// Connects and homes all three instruments. Fails `ConnectionLost` if any port's
    /// `connection_check` does not succeed.
    pub fn new(
        mut laser: L,
        mut shutter: S,
        mut motion: M,
        motion_poll_interval: Duration,
        motion_stability_window: Duration,
    ) -> EocResult<Self> {
        if !laser.connection_check()? {
            return Err(InstrumentError::ConnectionLost.into());
        }
        if !motion.connection_check()? {
            return Err(InstrumentError::ConnectionLost.into());
        }
        if !shutter.connection_check()? {
            return Err(InstrumentError::ConnectionLost.into());
        }

        motion.home()?;
        shutter.close()?;
        laser.set_lasing(true)?;

        info!("Coordinator: all instruments connected, homed, and safed");

        Ok(Self {
            laser,
            shutter,
            motion,
            motion_poll_interval,
            motion_stability_window,
        })
    }

    /// Moves to one of the four focus positions or the sample center (§4.4).
    pub fn go_to_focus_location(&mut self, tag: FocusTag, center_x_mm: f64, center_y_mm: f64) -> EocResult<()> {
        let (x, y) = match tag {
            FocusTag::Top => (center_x_mm, 22.0),
            FocusTag::Bottom => (center_x_mm, 8.0),
            FocusTag::Left => (12.0, center_y_mm),
            FocusTag::Right => (0.0, center_y_mm),
            FocusTag::Center => (center_x_mm, center_y_mm),
        };

        self.laser.set_power_mw(30.0)?;
        self.shutter.close()?;

        self.motion.move_absolute(1, x, 1.0)?;
        self.motion.move_absolute(2, y, 1.0)?;
        self.wait_for_movement()?;

        self.laser.set_lasing(true)?;
        Ok(())
    }

    /// Exposes ring `ring.index` (§4.4 `print_ring`). Does not wait for the rotation to
    /// complete — the Motion Worker polls that while ticking telemetry.
    pub fn print_ring(&mut self, ring: &Ring, grating_width_m: f64, laser_power_mw: f64) -> EocResult<()> {
        if ring.index > 0 {
            self.motion.move_relative(1, -grating_width_m, 1.0)?;
            self.wait_for_movement()?;
        }

        self.laser.set_lasing(true)?;
        self.laser.set_power_mw(laser_power_mw)?;
        self.shutter.open()?;

        let degrees = if ring.direction >= 0 { 360.0 } else { -360.0 };
        self.motion.move_relative(3, degrees, ring.angular_speed_deg_s)?;
        Ok(())
    }

    pub fn close_shutter(&mut self) -> EocResult<bool> {
        self.shutter.close()
    }

    pub fn open_shutter(&mut self) -> EocResult<bool> {
        self.shutter.open()
    }

    pub fn set_lasing(&mut self, enabled: bool) -> EocResult<()> {
        self.laser.set_lasing(enabled)
    }

    pub fn send_laser_command(&mut self, raw: &str) -> EocResult<String> {
        use crate::instrument::LineProtocol;
        self.laser.send(raw)
    }

    pub fn motion_status(&mut self) -> EocResult<[bool; 3]> {
        self.motion.motion_status()
    }

    pub fn position(&mut self, axis: u8) -> EocResult<f64> {
        self.motion.position(axis)
    }

    pub fn velocity(&mut self, axis: u8) -> EocResult<f64> {
        self.motion.velocity(axis)
    }

    pub fn stop_movement(&mut self) -> EocResult<()> {
        self.motion.stop_movement()
    }

    pub fn emergency_stop(&mut self) -> EocResult<()> {
        self.motion.emergency_stop()
    }

    /// Polls motion status until all three axes are clear, then confirms the clear
    /// state holds across the stability window; a mid-window resumption restarts the
    /// wait (§4.4, §8 property 7).
    pub fn wait_for_movement(&mut self) -> EocResult<()> {
        loop {
            while self.motion.motion_status()?.iter().any(|&moving| moving) {
                sleep(self.motion_poll_interval);
            }

            let window_start = Instant::now();
            let mut resumed = false;
            while window_start.elapsed() < self.motion_stability_window {
                if self.motion.motion_status()?.iter().any(|&moving| moving) {
                    resumed = true;
                    break;
                }
            }
            if !resumed {
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::mock::{MockLaserPort, MockMotionPort, MockShutterPort};

    fn coordinator() -> InstrumentCoordinator<MockLaserPort, MockShutterPort, MockMotionPort> {
        InstrumentCoordinator::new(
            MockLaserPort::default(),
            MockShutterPort::default(),
            MockMotionPort::default(),
            Duration::from_millis(1),
            Duration::from_millis(1),
        )
        .unwrap()
    }

    #[test]
    fn construction_homes_and_closes_shutter() {
        let coordinator = coordinator();
        assert_eq!(coordinator.shutter.open, false);
        assert!(coordinator.laser.lasing);
    }

    #[test]
    fn connection_failure_is_reported() {
        let result = InstrumentCoordinator::new(
            MockLaserPort {
                connected: false,
                ..Default::default()
            },
            MockShutterPort::default(),
            MockMotionPort::default(),
            Duration::from_millis(1),
            Duration::from_millis(1),
        );
        assert!(matches!(
            result,
            Err(EocError::Instrument(InstrumentError::ConnectionLost))
        ));
    }

    #[test]
    fn invalid_focus_tag_center_uses_settings_center_point() {
        let mut coordinator = coordinator();
        coordinator.go_to_focus_location(FocusTag::Center, 4.91, 16.51).unwrap();
        assert_eq!(coordinator.motion.positions[0], 4.91);
        assert_eq!(coordinator.motion.positions[1], 16.51);
    }

    #[test]
    fn print_ring_zero_skips_the_radial_step() {
        let ring = crate::synthesis::derive_ring(0, 0.00007, 0.00004, 11.0);
        let mut coordinator = coordinator();
        let before = coordinator.motion.positions[0];
        coordinator.print_ring(&ring, 0.00007, 150.0).unwrap();
        assert_eq!(coordinator.motion.positions[0], before);
        assert!(coordinator.shutter.open);
    }

    #[test]
    fn print_ring_nonzero_steps_radially_inward() {
        let ring = crate::synthesis::derive_ring(1, 0.00007, 0.00004, 11.0);
        let mut coordinator = coordinator();
        coordinator.print_ring(&ring, 0.00007, 150.0).unwrap();
        assert!((coordinator.motion.positions[0] - (-0.00007)).abs() < 1e-12);
    }
}
