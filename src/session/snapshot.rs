use serde::Serialize;

use super::log::LogEntry;
use super::machine::SessionState;
use crate::capability::{LocationSample, PermissionStatus};
use crate::contacts::Contact;

/// Point-in-time view of the controller
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub active: bool,
    pub state: SessionState,
    pub generation: u64,
    pub log: Vec<LogEntry>,
    pub current_index: usize,
    pub current_contact: Option<Contact>,
    pub recording: bool,
    pub permissions: PermissionStatus,
    pub location: Option<LocationSample>,
}

impl SessionSnapshot {
    /// Log texts without timestamps
    pub fn lines(&self) -> Vec<String> {
        self.log.iter().map(|e| e.text.clone()).collect()
    }
}
