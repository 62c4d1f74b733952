use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::artifact::AudioArtifact;
use super::backend::{AudioCapture, AudioFrame, CaptureConfig, CaptureHandle};
use crate::capability::PermissionState;
use crate::error::{Capability, CapabilityError};

struct ActiveCapture {
    stop_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<Result<AudioArtifact>>,
}

/// Microphone producing silent PCM buffers in real time
///
/// Stands in for a hardware input device: frames arrive on a channel at the
/// configured buffer interval, the same way a platform backend delivers them.
/// Only one capture may own the input stream at a time.
pub struct SimulatedMicrophone {
    config: CaptureConfig,
    available: bool,
    captures: Mutex<HashMap<Uuid, ActiveCapture>>,
}

impl SimulatedMicrophone {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            available: true,
            captures: Mutex::new(HashMap::new()),
        }
    }

    /// Microphone whose input device cannot be opened
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(CaptureConfig::default())
        }
    }

    fn open_input(&self) -> Result<(mpsc::Receiver<AudioFrame>, JoinHandle<()>), CapabilityError> {
        if !self.available {
            return Err(CapabilityError::Unavailable(
                Capability::Microphone,
                "no audio input device".to_string(),
            ));
        }

        let config = self.config.clone();
        let (tx, rx) = mpsc::channel(32);

        let input = tokio::spawn(async move {
            let period = Duration::from_millis(config.buffer_duration_ms);
            let mut ticker = tokio::time::interval(period);
            let mut timestamp_ms = 0;

            loop {
                ticker.tick().await;
                let frame = AudioFrame {
                    samples: vec![0i16; config.samples_per_buffer()],
                    sample_rate: config.sample_rate,
                    channels: config.channels,
                    timestamp_ms,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
                timestamp_ms += config.buffer_duration_ms;
            }
        });

        Ok((rx, input))
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, ActiveCapture>> {
        self.captures.lock().unwrap_or_else(|e| e.into_inner())
    }
}

async fn record(
    id: Uuid,
    config: CaptureConfig,
    mut audio_rx: mpsc::Receiver<AudioFrame>,
    input: JoinHandle<()>,
    max_duration: Duration,
    mut stop_rx: oneshot::Receiver<()>,
) -> Result<AudioArtifact> {
    let mut samples = Vec::new();
    let deadline = tokio::time::sleep(max_duration);
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => {
                info!("Capture {} reached {}ms limit", id, max_duration.as_millis());
                break;
            }
            _ = &mut stop_rx => break,
            frame = audio_rx.recv() => match frame {
                Some(frame) => samples.extend_from_slice(&frame.samples),
                None => {
                    warn!("Audio input closed during capture {}", id);
                    break;
                }
            },
        }
    }

    // Release the input stream
    input.abort();

    AudioArtifact::encode(id, &samples, config.sample_rate, config.channels)
}

#[async_trait]
impl AudioCapture for SimulatedMicrophone {
    async fn request_permission(&self) -> PermissionState {
        match self.open_input() {
            Ok((_rx, input)) => {
                input.abort();
                PermissionState::Granted
            }
            Err(e) => {
                warn!("Microphone probe failed: {}", e);
                PermissionState::Denied
            }
        }
    }

    async fn start_capture(&self, max_duration: Duration) -> Result<CaptureHandle, CapabilityError> {
        let mut captures = self.lock();
        if captures.values().any(|c| !c.task.is_finished()) {
            return Err(CapabilityError::Unavailable(
                Capability::Microphone,
                "input device busy".to_string(),
            ));
        }

        let (audio_rx, input) = self.open_input()?;
        let handle = CaptureHandle::new(max_duration);
        let (stop_tx, stop_rx) = oneshot::channel();

        let task = tokio::spawn(record(
            handle.id,
            self.config.clone(),
            audio_rx,
            input,
            max_duration,
            stop_rx,
        ));

        captures.insert(
            handle.id,
            ActiveCapture {
                stop_tx: Some(stop_tx),
                task,
            },
        );

        info!(
            "Capture {} started ({}Hz, {} channels, max {}ms)",
            handle.id,
            self.config.sample_rate,
            self.config.channels,
            max_duration.as_millis()
        );

        Ok(handle)
    }

    async fn stop_capture(&self, handle: &CaptureHandle) -> Option<AudioArtifact> {
        let mut capture = self.lock().remove(&handle.id)?;

        if let Some(stop_tx) = capture.stop_tx.take() {
            // The recorder may already have hit its limit
            let _ = stop_tx.send(());
        }

        match capture.task.await {
            Ok(Ok(artifact)) => {
                info!(
                    "Capture {} stopped: {:.1}s recorded",
                    handle.id,
                    artifact.duration_seconds()
                );
                Some(artifact)
            }
            Ok(Err(e)) => {
                error!("Capture {} failed to encode: {}", handle.id, e);
                None
            }
            Err(e) => {
                error!("Capture task {} panicked: {}", handle.id, e);
                None
            }
        }
    }

    fn is_capturing(&self, handle: &CaptureHandle) -> bool {
        self.lock()
            .get(&handle.id)
            .map(|c| !c.task.is_finished())
            .unwrap_or(false)
    }

    fn name(&self) -> &str {
        "simulated-microphone"
    }
}
