use async_trait::async_trait;
use std::sync::Mutex;
use tracing::info;

use super::links::tel_url;
use crate::error::{Capability, CapabilityError};

/// Hands a number to the platform telephony handler
///
/// Fire-and-forget: success only means the hand-off happened, not that the
/// call connected.
#[async_trait]
pub trait Dialer: Send + Sync {
    async fn dial(&self, number: &str) -> Result<(), CapabilityError>;
}

/// Dialer that logs the `tel:` hand-off and remembers every number
#[derive(Default)]
pub struct LogDialer {
    history: Mutex<Vec<String>>,
}

impl LogDialer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Numbers dialed so far, oldest first
    pub fn dialed(&self) -> Vec<String> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Dialer for LogDialer {
    async fn dial(&self, number: &str) -> Result<(), CapabilityError> {
        let number = number.trim();
        if number.is_empty() {
            return Err(CapabilityError::Unavailable(
                Capability::Telephony,
                "empty number".to_string(),
            ));
        }

        info!("Dialing {}", tel_url(number));
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(number.to_string());
        Ok(())
    }
}
