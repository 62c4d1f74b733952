//! Emergency session management
//!
//! This module provides:
//! - [`EmergencySession`] - the escalation state machine and its log
//! - [`EmergencyController`] - drives the machine with location, audio
//!   capture, dialing and answer detection on the tokio runtime
//! - [`SessionSnapshot`] - serializable view for the CLI and HTTP API

mod config;
mod controller;
mod log;
mod machine;
mod snapshot;

pub use config::SessionConfig;
pub use controller::{Capabilities, EmergencyController, TestRecording};
pub use log::{EmergencyLog, LogEntry, LogLevel};
pub use machine::{Action, CaptureOutcome, EmergencySession, Outcome, SessionEvent, SessionState};
pub use snapshot::SessionSnapshot;
