pub mod audio;
pub mod capability;
pub mod config;
pub mod contacts;
pub mod error;
pub mod http;
pub mod session;

pub use audio::{AudioArtifact, AudioCapture, CaptureConfig, CaptureHandle, SimulatedMicrophone};
pub use capability::{
    AnswerDetector, AnswerPrompt, ChannelAnswers, Dialer, FixedLocationProvider, LocationProvider,
    LocationSample, LogDialer, PermissionState, PermissionStatus, ScriptedAnswers,
};
pub use config::Config;
pub use contacts::{Contact, ContactStore, JsonFileStore, KeyValueStore, MemoryStore};
pub use error::{AlertError, Capability, CapabilityError};
pub use http::{create_router, AppState};
pub use session::{
    Capabilities, EmergencyController, EmergencySession, SessionConfig, SessionSnapshot,
    SessionState,
};
