//! The three-axis motion controller's RS-232 line protocol (§4.1).
//!
//! Grounded on `esp_controller.py`'s `ESPController` and the teacher's ESP300 driver
//! (`src/instrument/esp300.rs`) for the "hardware wants RTS/CTS, field testing says
//! `FlowControl::None`" note. Commands are a canonical triplet — optional axis prefix,
//! two-letter mnemonic, optional argument — joined with no separator and CR-terminated;
//! responses are terminated by the three-byte sequence CR CR LF.

use super::serial_helper::send_command;
use super::{LineProtocol, MotionDevice};
use crate::error::{EocResult, InstrumentError};
use log::{info, warn};
use serialport::SerialPort;
use std::time::Duration;

const BAUD_RATE: u32 = 19_200;
const READ_TIMEOUT: Duration = Duration::from_millis(500);
const COMMAND_TERMINATOR: &str = "\r";
const RESPONSE_TERMINATOR: &str = "\r\r\n";
const NO_ERROR_SENTINEL: &str = "NO ERROR DETECTED";
const AXIS_COUNT: u8 = 3;

pub struct MotionPort {
    port: Box<dyn SerialPort>,
}

fn triplet(axis: Option<u8>, mnemonic: &str, argument: Option<&str>) -> String {
    let mut command = String::new();
    if let Some(axis) = axis {
        command.push_str(&axis.to_string());
    }
    command.push_str(mnemonic);
    if let Some(argument) = argument {
        command.push_str(argument);
    }
    command
}

impl MotionPort {
    pub fn open(port_name: &str) -> EocResult<Self> {
        // Despite RS-232 documentation suggesting RTS/CTS hardware flow control for this
        // family of controller, field testing against the physical unit showed
        // FlowControl::None to be the configuration that actually works.
        let port = serialport::new(port_name, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .flow_control(serialport::FlowControl::None)
            .open()?;
        info!("Motion controller: initialized on {port_name}");
        Ok(Self { port })
    }

    /// Sends a raw command with no automatic error-buffer polling, for sequences that
    /// deliberately queue several commands and check errors once at the end.
    fn send_no_check(&mut self, axis: Option<u8>, mnemonic: &str, argument: Option<&str>) -> EocResult<String> {
        let command = triplet(axis, mnemonic, argument);
        send_command(
            &mut *self.port,
            "motion",
            &command,
            COMMAND_TERMINATOR,
            READ_TIMEOUT,
            RESPONSE_TERMINATOR,
        )
    }

    fn error_count(&mut self) -> EocResult<i64> {
        let response = self.send_no_check(None, "TE", None)?;
        response
            .trim()
            .parse::<i64>()
            .map_err(|_| InstrumentError::DeviceError(format!("unparseable error count: {response}")).into())
    }

    /// Aggregated error check for a `send_no_check` batch: polls `TE` once the whole
    /// sequence has been queued and, if it's non-zero, drains `TB` for the message.
    fn aggregated_error_check(&mut self) -> EocResult<()> {
        let count = self.error_count()?;
        if count != 0 {
            let buffer = self.send_no_check(None, "TB", None)?;
            return Err(InstrumentError::DeviceError(buffer).into());
        }
        Ok(())
    }
}

impl LineProtocol for MotionPort {
    fn send(&mut self, command: &str) -> EocResult<String> {
        let response = send_command(
            &mut *self.port,
            "motion",
            command,
            COMMAND_TERMINATOR,
            READ_TIMEOUT,
            RESPONSE_TERMINATOR,
        )?;
        self.aggregated_error_check()?;
        Ok(response)
    }

    fn connection_check(&mut self) -> EocResult<bool> {
        match self.error_count() {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }
}

impl MotionDevice for MotionPort {
    fn home(&mut self) -> EocResult<()> {
        for axis in 1..=AXIS_COUNT {
            self.send_no_check(Some(axis), "MO", None)?;
            self.send_no_check(Some(axis), "OR", None)?;
        }
        info!("Motion controller: homing issued on all axes");
        Ok(())
    }

    fn clear_error_buffer(&mut self) -> EocResult<()> {
        loop {
            let message = self.send_no_check(None, "TB", None)?;
            if message.trim().ends_with(NO_ERROR_SENTINEL) {
                return Ok(());
            }
            warn!("Motion controller: clearing buffered error: {message}");
        }
    }

    fn motion_status(&mut self) -> EocResult<[bool; 3]> {
        let response = self.send_no_check(None, "TS", None)?;
        // The status register's first returned byte is a bitmap of per-axis motion;
        // parse the response as a byte value and test the low three bits.
        let byte = response
            .bytes()
            .next()
            .ok_or_else(|| InstrumentError::DeviceError("empty TS response".to_string()))?;
        Ok([byte & 0b001 != 0, byte & 0b010 != 0, byte & 0b100 != 0])
    }

    fn position(&mut self, axis: u8) -> EocResult<f64> {
        let response = self.send_no_check(Some(axis), "TP", None)?;
        response
            .trim()
            .parse()
            .map_err(|_| InstrumentError::DeviceError(format!("unparseable position: {response}")).into())
    }

    fn velocity(&mut self, axis: u8) -> EocResult<f64> {
        let response = self.send_no_check(Some(axis), "TV", None)?;
        response
            .trim()
            .parse()
            .map_err(|_| InstrumentError::DeviceError(format!("unparseable velocity: {response}")).into())
    }

    fn max_velocity(&mut self, axis: u8) -> EocResult<f64> {
        let response = self.send_no_check(Some(axis), "VU", Some("?"))?;
        response
            .trim()
            .parse()
            .map_err(|_| InstrumentError::DeviceError(format!("unparseable max velocity: {response}")).into())
    }

    fn move_absolute(&mut self, axis: u8, position_mm: f64, speed: f64) -> EocResult<()> {
        let current_speed = self.send_no_check(Some(axis), "VA", Some("?"))?;
        self.send_no_check(Some(1), "EP", None)?;
        self.send_no_check(Some(axis), "VA", Some(&speed.to_string()))?;
        self.send_no_check(Some(axis), "PA", Some(&position_mm.to_string()))?;
        self.send_no_check(Some(axis), "WS", None)?;
        self.send_no_check(Some(axis), "VA", Some(current_speed.trim()))?;
        self.send_no_check(Some(1), "QP", None)?;
        self.send_no_check(Some(1), "EX", None)?;
        self.send_no_check(Some(1), "XX", None)?;
        self.aggregated_error_check()?;
        info!("Motion controller: axis {axis} moved absolute to {position_mm} mm");
        Ok(())
    }

    fn move_relative(&mut self, axis: u8, distance_mm: f64, speed: f64) -> EocResult<()> {
        let current_speed = self.send_no_check(Some(axis), "VA", Some("?"))?;
        self.send_no_check(Some(1), "EP", None)?;
        self.send_no_check(Some(axis), "VA", Some(&speed.to_string()))?;
        self.send_no_check(Some(axis), "PR", Some(&distance_mm.to_string()))?;
        self.send_no_check(Some(axis), "WS", None)?;
        self.send_no_check(Some(axis), "VA", Some(current_speed.trim()))?;
        self.send_no_check(Some(1), "QP", None)?;
        self.send_no_check(Some(1), "EX", None)?;
        self.send_no_check(Some(1), "XX", None)?;
        self.aggregated_error_check()?;
        info!("Motion controller: axis {axis} moved relative by {distance_mm} mm");
        Ok(())
    }

    fn stop_movement(&mut self) -> EocResult<()> {
        self.send_no_check(None, "ST", None)?;
        info!("Motion controller: soft stop issued");
        Ok(())
    }

    fn emergency_stop(&mut self) -> EocResult<()> {
        self.send_no_check(None, "AB", None)?;
        warn!("Motion controller: emergency stop issued");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triplet_joins_axis_mnemonic_and_argument_with_no_separator() {
        assert_eq!(triplet(Some(1), "PA", Some("5.0")), "1PA5.0");
        assert_eq!(triplet(None, "TE", None), "TE");
        assert_eq!(triplet(Some(3), "VU", Some("?")), "3VU?");
    }
}
