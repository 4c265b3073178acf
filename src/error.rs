//! Crate-wide error types.
//!
//! `EocError` is the single error enum for the Exposure Orchestration Core, built with
//! `thiserror` the way the source daemon's `DaqError` is: one variant per failure domain,
//! with `#[from]` conversions so `?` works at every call site. [`InstrumentError`] is the
//! sub-hierarchy for the three RS-232 devices (§3, §7 of the spec) and embeds into
//! `EocError` rather than living as a parallel error type.

use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type EocResult<T> = std::result::Result<T, EocError>;

/// Errors reported by the three instrument ports (laser, shutter, motion controller).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InstrumentError {
    #[error("connection lost")]
    ConnectionLost,

    #[error("command unknown")]
    CommandUnknown,

    #[error("device error: {0}")]
    DeviceError(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("protocol timeout")]
    ProtocolTimeout,
}

#[derive(Error, Debug)]
pub enum EocError {
    #[error(transparent)]
    Instrument(#[from] InstrumentError),

    #[error("requested display monitor {requested} is out of range ({available} monitor(s) detected)")]
    NoSecondMonitor { requested: usize, available: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serial port error: {0}")]
    SerialPort(#[from] serialport::Error),

    #[error("settings (de)serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("application configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("settings validation error: {0}")]
    Validation(String),

    #[error("a shared telemetry lock was poisoned")]
    PoisonedLock,

    #[error("command queue is closed")]
    QueueClosed,

    #[error("cancelled")]
    Cancelled,
}

impl<T> From<std::sync::PoisonError<T>> for EocError {
    fn from(_: std::sync::PoisonError<T>) -> Self {
        EocError::PoisonedLock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_error_embeds_into_eoc_error() {
        let err: EocError = InstrumentError::ConnectionLost.into();
        assert_eq!(err.to_string(), "connection lost");
    }

    #[test]
    fn device_error_carries_detail() {
        let err = InstrumentError::DeviceError("NO ERROR DETECTED".into());
        assert!(err.to_string().contains("NO ERROR DETECTED"));
    }
}
