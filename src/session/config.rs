use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing of an emergency session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Timeout of the location fix taken on activation
    pub location_timeout_ms: u64,

    /// Length of the emergency recording
    pub recording_ms: u64,

    /// Wait between dialing a contact and asking whether they answered
    pub answer_delay_ms: u64,

    /// Wait before offering to dial the fallback number when no contacts exist
    pub fallback_delay_ms: u64,

    /// Length of a microphone test recording
    pub test_recording_ms: u64,

    /// Bound on the location query used to probe permission
    pub permission_probe_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            location_timeout_ms: 10_000,
            recording_ms: 30_000,
            answer_delay_ms: 3_000,
            fallback_delay_ms: 5_000,
            test_recording_ms: 5_000,
            permission_probe_ms: 5_000,
        }
    }
}

impl SessionConfig {
    pub fn location_timeout(&self) -> Duration {
        Duration::from_millis(self.location_timeout_ms)
    }

    pub fn recording(&self) -> Duration {
        Duration::from_millis(self.recording_ms)
    }

    pub fn answer_delay(&self) -> Duration {
        Duration::from_millis(self.answer_delay_ms)
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }

    pub fn test_recording(&self) -> Duration {
        Duration::from_millis(self.test_recording_ms)
    }

    pub fn permission_probe(&self) -> Duration {
        Duration::from_millis(self.permission_probe_ms)
    }
}
