use std::sync::Arc;

use crate::capability::ChannelAnswers;
use crate::config::{Config, EmergencyService};
use crate::session::EmergencyController;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub controller: EmergencyController,
    /// Answer detection fed by `POST /emergency/answer`
    pub answers: Arc<ChannelAnswers>,
    pub directory: Arc<Vec<EmergencyService>>,
    pub support_email: String,
}

impl AppState {
    pub fn new(config: &Config, controller: EmergencyController, answers: Arc<ChannelAnswers>) -> Self {
        Self {
            controller,
            answers,
            directory: Arc::new(config.emergency.directory.clone()),
            support_email: config.links.support_email.clone(),
        }
    }
}
