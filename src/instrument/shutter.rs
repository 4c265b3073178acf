//! The shutter's RS-232 line protocol (§4.1).
//!
//! Grounded on `shutter_controller.py`'s `ShutterController` (Thorlabs SC10-style
//! device): 9600 8N1, CR-terminated commands, responses terminated by the device's `>`
//! prompt. The source wraps the response in `repr()` before testing it for "0"/"1",
//! which only works because CPython's `repr` happens to leave ASCII digits untouched —
//! that detour is dropped here in favor of checking the trimmed response directly.

use super::serial_helper::send_command;
use super::{LineProtocol, ShutterDevice};
use crate::error::{EocError, EocResult, InstrumentError};
use log::info;
use serialport::SerialPort;
use std::time::Duration;

const BAUD_RATE: u32 = 9_600;
const READ_TIMEOUT: Duration = Duration::from_millis(500);
const COMMAND_TERMINATOR: &str = "\r";
const RESPONSE_TERMINATOR: &str = ">";

pub struct ShutterPort {
    port: Box<dyn SerialPort>,
}

impl ShutterPort {
    pub fn open(port_name: &str) -> EocResult<Self> {
        let port = serialport::new(port_name, BAUD_RATE)
            .timeout(READ_TIMEOUT)
            .open()?;
        info!("Shutter: initialized on {port_name}");
        Ok(Self { port })
    }

    fn send_raw(&mut self, command: &str) -> EocResult<String> {
        send_command(
            &mut *self.port,
            "shutter",
            command,
            COMMAND_TERMINATOR,
            READ_TIMEOUT,
            RESPONSE_TERMINATOR,
        )
    }
}

impl LineProtocol for ShutterPort {
    fn send(&mut self, command: &str) -> EocResult<String> {
        self.send_raw(command)
    }

    fn connection_check(&mut self) -> EocResult<bool> {
        match self.send_raw("") {
            Ok(response) => Ok(response.contains("Command error CMD_NOT_DEFINED")),
            Err(EocError::Instrument(InstrumentError::ConnectionLost)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

impl ShutterDevice for ShutterPort {
    fn state(&mut self) -> EocResult<bool> {
        let response = self.send_raw("ens?")?;
        if response.contains('1') {
            Ok(true)
        } else if response.contains('0') {
            Ok(false)
        } else {
            Err(InstrumentError::DeviceError(format!(
                "unexpected shutter state response: {response}"
            ))
            .into())
        }
    }

    fn open(&mut self) -> EocResult<bool> {
        if self.state()? {
            info!("Shutter: already open");
            return Ok(false);
        }
        self.send_raw("ens")?;
        info!("Shutter: opened");
        Ok(true)
    }

    fn close(&mut self) -> EocResult<bool> {
        if !self.state()? {
            info!("Shutter: already closed");
            return Ok(false);
        }
        self.send_raw("ens")?;
        info!("Shutter: closed");
        Ok(true)
    }
}
