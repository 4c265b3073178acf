//! In-memory stand-ins for the three instrument traits, used by the coordinator and
//! worker test suites (§8's testable properties are largely exercised against these
//! rather than real hardware).
//!
//! Grounded on the teacher's `MockInstrument` in spirit (a stateful substitute that
//! behaves like the real thing closely enough to drive the rest of the system under
//! test) but built around the three capability traits instead of the teacher's
//! `Instrument`/`measure` shape, since nothing here publishes a `DataPoint` stream.

use super::{LaserDevice, LineProtocol, MotionDevice, ShutterDevice};
use crate::error::{EocResult, InstrumentError};

/// A laser stand-in that records lasing/power state and can be told to fail its next
/// `n` operations, for exercising the worker's retry policy (§8 property 5 / S5).
pub struct MockLaserPort {
    pub lasing: bool,
    pub power_mw: f64,
    pub connected: bool,
    pub fail_next: usize,
}

impl Default for MockLaserPort {
    fn default() -> Self {
        Self {
            lasing: false,
            power_mw: 0.0,
            connected: true,
            fail_next: 0,
        }
    }
}

impl MockLaserPort {
    fn maybe_fail(&mut self) -> EocResult<()> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(InstrumentError::DeviceError("scripted failure".to_string()).into());
        }
        Ok(())
    }
}

impl LineProtocol for MockLaserPort {
    fn send(&mut self, command: &str) -> EocResult<String> {
        self.maybe_fail()?;
        Ok(format!("ok:{command}"))
    }

    fn connection_check(&mut self) -> EocResult<bool> {
        Ok(self.connected)
    }
}

impl LaserDevice for MockLaserPort {
    fn set_lasing(&mut self, enabled: bool) -> EocResult<()> {
        self.maybe_fail()?;
        self.lasing = enabled;
        Ok(())
    }

    fn set_power_mw(&mut self, power_mw: f64) -> EocResult<()> {
        self.maybe_fail()?;
        self.power_mw = power_mw;
        Ok(())
    }
}

/// A shutter stand-in with the same open/closed toggle semantics as the real device.
pub struct MockShutterPort {
    pub open: bool,
    pub connected: bool,
    pub fail_next: usize,
}

impl Default for MockShutterPort {
    fn default() -> Self {
        Self {
            open: false,
            connected: true,
            fail_next: 0,
        }
    }
}

impl MockShutterPort {
    fn maybe_fail(&mut self) -> EocResult<()> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(InstrumentError::DeviceError("scripted failure".to_string()).into());
        }
        Ok(())
    }
}

impl LineProtocol for MockShutterPort {
    fn send(&mut self, command: &str) -> EocResult<String> {
        self.maybe_fail()?;
        Ok(format!("ok:{command}"))
    }

    fn connection_check(&mut self) -> EocResult<bool> {
        Ok(self.connected)
    }
}

impl ShutterDevice for MockShutterPort {
    fn state(&mut self) -> EocResult<bool> {
        self.maybe_fail()?;
        Ok(self.open)
    }

    fn open(&mut self) -> EocResult<bool> {
        self.maybe_fail()?;
        if self.open {
            Ok(false)
        } else {
            self.open = true;
            Ok(true)
        }
    }

    fn close(&mut self) -> EocResult<bool> {
        self.maybe_fail()?;
        if self.open {
            self.open = false;
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

/// A three-axis motion controller stand-in. Moves resolve instantly (`moving` stays
/// false), so `wait_for_movement` against this mock returns immediately; tests that need
/// to observe a mid-window resumption drive `moving` directly.
pub struct MockMotionPort {
    pub positions: [f64; 3],
    pub speeds: [f64; 3],
    pub moving: [bool; 3],
    pub max_speed: f64,
    pub connected: bool,
    pub fail_next: usize,
}

impl Default for MockMotionPort {
    fn default() -> Self {
        Self {
            positions: [0.0; 3],
            speeds: [0.0; 3],
            moving: [false; 3],
            max_speed: 1000.0,
            connected: true,
            fail_next: 0,
        }
    }
}

impl MockMotionPort {
    fn maybe_fail(&mut self) -> EocResult<()> {
        if self.fail_next > 0 {
            self.fail_next -= 1;
            return Err(InstrumentError::DeviceError("scripted failure".to_string()).into());
        }
        Ok(())
    }
}

impl LineProtocol for MockMotionPort {
    fn send(&mut self, command: &str) -> EocResult<String> {
        self.maybe_fail()?;
        Ok(format!("ok:{command}"))
    }

    fn connection_check(&mut self) -> EocResult<bool> {
        Ok(self.connected)
    }
}

impl MotionDevice for MockMotionPort {
    fn home(&mut self) -> EocResult<()> {
        self.maybe_fail()?;
        self.positions = [0.0; 3];
        Ok(())
    }

    fn clear_error_buffer(&mut self) -> EocResult<()> {
        self.maybe_fail()
    }

    fn motion_status(&mut self) -> EocResult<[bool; 3]> {
        self.maybe_fail()?;
        Ok(self.moving)
    }

    fn position(&mut self, axis: u8) -> EocResult<f64> {
        self.maybe_fail()?;
        Ok(self.positions[axis as usize - 1])
    }

    fn velocity(&mut self, axis: u8) -> EocResult<f64> {
        self.maybe_fail()?;
        Ok(self.speeds[axis as usize - 1])
    }

    fn max_velocity(&mut self, _axis: u8) -> EocResult<f64> {
        self.maybe_fail()?;
        Ok(self.max_speed)
    }

    fn move_absolute(&mut self, axis: u8, position_mm: f64, speed: f64) -> EocResult<()> {
        self.maybe_fail()?;
        self.positions[axis as usize - 1] = position_mm;
        self.speeds[axis as usize - 1] = speed;
        Ok(())
    }

    fn move_relative(&mut self, axis: u8, distance_mm: f64, speed: f64) -> EocResult<()> {
        self.maybe_fail()?;
        self.positions[axis as usize - 1] += distance_mm;
        self.speeds[axis as usize - 1] = speed;
        Ok(())
    }

    fn stop_movement(&mut self) -> EocResult<()> {
        self.maybe_fail()?;
        self.moving = [false; 3];
        Ok(())
    }

    fn emergency_stop(&mut self) -> EocResult<()> {
        self.maybe_fail()?;
        self.moving = [false; 3];
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_shutter_open_close_are_idempotent() {
        let mut shutter = MockShutterPort::default();
        assert!(shutter.open().unwrap());
        assert!(!shutter.open().unwrap());
        assert!(shutter.close().unwrap());
        assert!(!shutter.close().unwrap());
    }

    #[test]
    fn mock_laser_fails_exactly_the_scripted_number_of_times() {
        let mut laser = MockLaserPort {
            fail_next: 1,
            ..Default::default()
        };
        assert!(laser.set_lasing(true).is_err());
        assert!(laser.set_lasing(true).is_ok());
    }
}
