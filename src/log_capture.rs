//! A custom log collector for capturing application logs for display in the GUI.
//!
//! Adapted from the teacher's `log_capture` module. The teacher stamps entries with
//! `chrono::DateTime<Local>`; this crate has no other use for a datetime dependency, so
//! entries are stamped with elapsed time since process start instead, which is all the
//! Start screen's live tail needs.

use egui::Color32;
use log::{Level, Log, Metadata, Record};
use once_cell::sync::Lazy;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

const MAX_LOG_ENTRIES: usize = 1000;

static PROCESS_START: Lazy<Instant> = Lazy::new(Instant::now);

/// Represents a single log entry.
#[derive(Clone)]
pub struct LogEntry {
    pub elapsed: Duration,
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    /// Returns a color corresponding to the log level for GUI display.
    pub fn color(&self) -> Color32 {
        match self.level {
            Level::Error => Color32::from_rgb(255, 100, 100),
            Level::Warn => Color32::from_rgb(255, 255, 100),
            Level::Info => Color32::from_rgb(100, 200, 255),
            Level::Debug => Color32::from_rgb(150, 150, 150),
            Level::Trace => Color32::from_rgb(200, 150, 255),
        }
    }
}

/// A thread-safe, fixed-capacity log buffer.
#[derive(Clone)]
pub struct LogBuffer(Arc<Mutex<VecDeque<LogEntry>>>);

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBuffer {
    pub fn new() -> Self {
        Self(Arc::new(Mutex::new(VecDeque::with_capacity(MAX_LOG_ENTRIES))))
    }

    pub fn read(&self) -> std::sync::MutexGuard<'_, VecDeque<LogEntry>> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn clear(&self) {
        self.0.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

/// A simple logger that captures logs into a `LogBuffer`, mirrored alongside the
/// `env_logger` console backend rather than replacing it.
pub struct LogCollector {
    buffer: LogBuffer,
}

impl LogCollector {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }
}

impl Log for LogCollector {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let mut buffer = self.buffer.0.lock().unwrap_or_else(|e| e.into_inner());
        if buffer.len() >= MAX_LOG_ENTRIES {
            buffer.pop_front();
        }
        buffer.push_back(LogEntry {
            elapsed: PROCESS_START.elapsed(),
            level: record.level(),
            target: record.target().to_string(),
            message: format!("{}", record.args()),
        });
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_evicts_oldest_entry_past_capacity() {
        let buffer = LogBuffer::new();
        let collector = LogCollector::new(buffer.clone());
        for i in 0..(MAX_LOG_ENTRIES + 10) {
            collector.log(
                &Record::builder()
                    .args(format_args!("entry {i}"))
                    .level(Level::Info)
                    .target("test")
                    .build(),
            );
        }
        assert_eq!(buffer.read().len(), MAX_LOG_ENTRIES);
    }
}
