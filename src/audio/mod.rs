pub mod artifact;
pub mod backend;
pub mod microphone;

pub use artifact::AudioArtifact;
pub use backend::{AudioCapture, AudioFrame, CaptureConfig, CaptureHandle};
pub use microphone::SimulatedMicrophone;
