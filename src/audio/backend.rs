use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;
use uuid::Uuid;

use super::artifact::AudioArtifact;
use crate::capability::PermissionState;
use crate::error::CapabilityError;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Input stream format
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    /// 1 = mono, 2 = stereo
    pub channels: u16,
    /// Buffer size in milliseconds
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 100,
        }
    }
}

impl CaptureConfig {
    pub fn samples_per_buffer(&self) -> usize {
        (self.sample_rate as u64 * self.channels as u64 * self.buffer_duration_ms / 1000) as usize
    }
}

/// Reference to one running (or finished) capture
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CaptureHandle {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    #[serde(skip)]
    pub max_duration: Duration,
}

impl CaptureHandle {
    pub fn new(max_duration: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            max_duration,
        }
    }
}

/// Audio capture capability
///
/// The recorded audio stays in memory; it is handed back on stop and never
/// written to disk or sent anywhere.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Open and immediately release an input stream to probe availability
    async fn request_permission(&self) -> PermissionState;

    /// Start recording; stops by itself once `max_duration` elapses
    async fn start_capture(&self, max_duration: Duration) -> Result<CaptureHandle, CapabilityError>;

    /// Stop a capture and release its input stream
    ///
    /// Idempotent: unknown or already stopped handles return `None`.
    async fn stop_capture(&self, handle: &CaptureHandle) -> Option<AudioArtifact>;

    /// Whether the capture is still recording
    fn is_capturing(&self, handle: &CaptureHandle) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}
