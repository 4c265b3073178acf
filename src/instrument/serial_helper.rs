//! Blocking line-oriented serial I/O shared by the three instrument ports.
//!
//! Adapted from the source daemon's `send_command` helper: write the full command with
//! its terminator, then read until the response terminator is observed or the timeout
//! elapses. The async wrapper used upstream to keep the host runtime unblocked is dropped
//! here — every instrument lives on the dedicated Motion Worker thread, so a blocking read
//! is exactly what's wanted rather than something to hide behind `spawn_blocking`.

use crate::error::{EocResult, InstrumentError};
use log::trace;
use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

/// Sends `command` (appending `terminator`) and reads until `response_terminator` appears
/// in the accumulated response or `timeout` elapses.
///
/// An empty response (read timed out with nothing received) is `ConnectionLost`. A
/// response containing a NUL byte is `CommandUnknown`, matching the laser protocol's
/// convention; the other two ports never emit NUL and so never hit that branch.
pub fn send_command(
    port: &mut dyn SerialPort,
    instrument_id: &str,
    command: &str,
    terminator: &str,
    timeout: Duration,
    response_terminator: &str,
) -> EocResult<String> {
    let cmd = format!("{command}{terminator}");
    trace!("{instrument_id}: sending '{}'", cmd.escape_default());

    port.write_all(cmd.as_bytes())
        .map_err(|_| InstrumentError::ConnectionLost)?;

    let mut buffer = [0u8; 1024];
    let mut response = String::new();
    let start = Instant::now();

    while start.elapsed() < timeout {
        match port.read(&mut buffer) {
            Ok(n) if n > 0 => {
                response.push_str(&String::from_utf8_lossy(&buffer[..n]));
                if response.contains(response_terminator) {
                    break;
                }
            }
            _ => std::thread::sleep(Duration::from_millis(10)),
        }
    }

    trace!("{instrument_id}: received '{}'", response.escape_default());

    if response.is_empty() {
        return Err(InstrumentError::ConnectionLost.into());
    }
    if response.contains('\u{0}') {
        return Err(InstrumentError::CommandUnknown.into());
    }

    Ok(response.trim().to_string())
}

#[cfg(test)]
mod tests {
    // `send_command` is exercised indirectly through the mock device implementations,
    // which stand in for a real `SerialPort` without needing a hardware loopback.
}
