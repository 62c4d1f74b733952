use serde::{Deserialize, Serialize};

/// Permission state of a device capability
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionState {
    Granted,
    Denied,
    /// Not probed yet
    #[default]
    Prompt,
}

impl PermissionState {
    pub fn is_granted(self) -> bool {
        self == PermissionState::Granted
    }

    pub fn from_probe<T, E>(result: &Result<T, E>) -> Self {
        if result.is_ok() {
            PermissionState::Granted
        } else {
            PermissionState::Denied
        }
    }
}

/// Permissions derived from probing both capabilities; never persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PermissionStatus {
    pub location: PermissionState,
    pub microphone: PermissionState,
}
