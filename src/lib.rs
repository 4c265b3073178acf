//! The Exposure Orchestration Core: frame synthesis, instrument sequencing, and the
//! worker/UI split that drives the sine phase plate fabrication process.

pub mod app_config;
pub mod command;
pub mod coordinator;
pub mod error;
pub mod frame;
pub mod gui;
pub mod instrument;
pub mod log_capture;
pub mod settings;
pub mod synthesis;
pub mod telemetry;
pub mod validation;
pub mod worker;
