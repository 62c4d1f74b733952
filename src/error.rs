use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Device capability an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Capability {
    Location,
    Microphone,
    Telephony,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::Location => write!(f, "location"),
            Capability::Microphone => write!(f, "microphone"),
            Capability::Telephony => write!(f, "telephony"),
        }
    }
}

/// Failure reported by a capability provider
///
/// These never abort an emergency session; the controller downgrades them
/// to warnings in the session log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CapabilityError {
    #[error("{0} permission denied")]
    PermissionDenied(Capability),

    #[error("{0} unavailable: {1}")]
    Unavailable(Capability, String),
}

impl CapabilityError {
    pub fn capability(&self) -> Capability {
        match self {
            CapabilityError::PermissionDenied(c) | CapabilityError::Unavailable(c, _) => *c,
        }
    }
}

/// Errors surfaced to callers of the store and controller
#[derive(Debug, Error)]
pub enum AlertError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error("contact rejected: {0}")]
    ValidationRejected(String),

    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

impl AlertError {
    pub fn is_validation(&self) -> bool {
        matches!(self, AlertError::ValidationRejected(_))
    }
}
