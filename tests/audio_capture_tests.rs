// Tests for the simulated microphone capture backend
//
// Time is paused so recordings of several seconds complete instantly.

use safe_alert::audio::{AudioCapture, CaptureConfig, SimulatedMicrophone};
use safe_alert::capability::PermissionState;
use safe_alert::error::{Capability, CapabilityError};
use std::time::Duration;
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_capture_stops_itself_at_limit() {
    let mic = SimulatedMicrophone::new(CaptureConfig::default());
    let handle = mic.start_capture(Duration::from_secs(2)).await.unwrap();
    assert!(mic.is_capturing(&handle));

    sleep(Duration::from_secs(3)).await;
    assert!(!mic.is_capturing(&handle));

    let artifact = mic.stop_capture(&handle).await.expect("artifact after auto-stop");
    assert_eq!(artifact.capture_id, handle.id);
    assert_eq!(artifact.sample_rate, 16000);
    assert_eq!(artifact.channels, 1);
    // 100ms buffers; the last one may land on either side of the limit
    assert!(artifact.duration_seconds() >= 1.8);
    assert!(artifact.duration_seconds() <= 2.2);
}

#[tokio::test(start_paused = true)]
async fn test_stop_is_idempotent() {
    let mic = SimulatedMicrophone::new(CaptureConfig::default());
    let handle = mic.start_capture(Duration::from_secs(30)).await.unwrap();

    sleep(Duration::from_millis(500)).await;

    let first = mic.stop_capture(&handle).await;
    assert!(first.is_some());
    assert!(!mic.is_capturing(&handle));

    assert!(mic.stop_capture(&handle).await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_input_is_exclusive() {
    let mic = SimulatedMicrophone::new(CaptureConfig::default());
    let first = mic.start_capture(Duration::from_secs(30)).await.unwrap();

    let err = mic.start_capture(Duration::from_secs(5)).await.unwrap_err();
    assert!(matches!(err, CapabilityError::Unavailable(Capability::Microphone, _)));

    mic.stop_capture(&first).await;
    let second = mic.start_capture(Duration::from_secs(5)).await;
    assert!(second.is_ok());
}

#[tokio::test]
async fn test_missing_device_is_denied() {
    let mic = SimulatedMicrophone::unavailable();

    assert_eq!(mic.request_permission().await, PermissionState::Denied);
    let err = mic.start_capture(Duration::from_secs(30)).await.unwrap_err();
    assert_eq!(err.capability(), Capability::Microphone);
}

#[tokio::test]
async fn test_probe_does_not_hold_the_input() {
    let mic = SimulatedMicrophone::new(CaptureConfig::default());

    assert_eq!(mic.request_permission().await, PermissionState::Granted);
    // The probe released its stream, so a capture can start
    assert!(mic.start_capture(Duration::from_secs(1)).await.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_artifact_decodes_to_recorded_samples() {
    let config = CaptureConfig {
        sample_rate: 8000,
        channels: 1,
        buffer_duration_ms: 100,
    };
    let mic = SimulatedMicrophone::new(config);
    let handle = mic.start_capture(Duration::from_secs(1)).await.unwrap();

    sleep(Duration::from_secs(2)).await;

    let artifact = mic.stop_capture(&handle).await.unwrap();
    let samples = artifact.samples().unwrap();
    assert_eq!(samples.len(), artifact.sample_count);
    assert!(samples.iter().all(|&s| s == 0));
    assert_eq!(samples.len() % 800, 0);
}
