//! The laser's RS-232 line protocol (§4.1).
//!
//! Grounded on `laser_controller.py`'s `LaserController`: 19200 8N1, CR-terminated
//! commands, CRLF-terminated responses, a mandatory `>=0` at open to switch the device
//! into numeric protocol mode, and a NUL byte in the response meaning `CommandUnknown`.

use super::serial_helper::send_command;
use super::{LaserDevice, LineProtocol};
use crate::error::{EocError, EocResult, InstrumentError};
use log::info;
use serialport::SerialPort;
use std::time::Duration;

const BAUD_RATE: u32 = 19_200;
const READ_TIMEOUT: Duration = Duration::from_millis(500);
const COMMAND_TERMINATOR: &str = "\r";
const RESPONSE_TERMINATOR: &str = "\r\n";

pub struct LaserPort {
    port: Box<dyn SerialPort>,
}

impl LaserPort {
    /// Opens the laser port and issues the mandatory numeric-protocol switch command.
    pub fn open(port_name: &str) -> EocResult<Self> {
        let port = serialport::new(port_name, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()?;
        let mut laser = Self { port };
        laser.send_no_check(">=0")?;
        info!("Laser: initialized on {port_name}");
        Ok(laser)
    }

    fn send_no_check(&mut self, command: &str) -> EocResult<String> {
        send_command(
            &mut *self.port,
            "laser",
            command,
            COMMAND_TERMINATOR,
            READ_TIMEOUT,
            RESPONSE_TERMINATOR,
        )
    }
}

impl LineProtocol for LaserPort {
    fn send(&mut self, command: &str) -> EocResult<String> {
        self.send_no_check(command)
    }

    fn connection_check(&mut self) -> EocResult<bool> {
        match self.send_no_check("") {
            Ok(_) => Ok(true),
            Err(EocError::Instrument(InstrumentError::ConnectionLost)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl LaserDevice for LaserPort {
    fn set_lasing(&mut self, enabled: bool) -> EocResult<()> {
        let command = if enabled { "L=1" } else { "L=0" };
        self.send_no_check(command)?;
        info!("Laser: lasing {}", if enabled { "enabled" } else { "disabled" });
        Ok(())
    }

    fn set_power_mw(&mut self, power_mw: f64) -> EocResult<()> {
        self.send_no_check(&format!("P={power_mw}"))?;
        info!("Laser: power set to {power_mw} mW");
        Ok(())
    }
}
