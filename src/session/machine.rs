use chrono::Local;
use serde::Serialize;
use tracing::{debug, info};

use super::log::{EmergencyLog, LogLevel};
use crate::capability::LocationSample;
use crate::config::{EmergencyConfig, EmergencyService};
use crate::contacts::Contact;
use crate::error::CapabilityError;

/// How a finished session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Answered { index: usize },
    Exhausted,
    FallbackDialed,
    FallbackDeclined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    /// Location and recording requested, escalation not started yet
    Activating,
    /// No contacts; waiting to offer the fallback number
    AwaitingFallback,
    Escalating { index: usize },
    Finished(Outcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Started { max_secs: u64 },
    Failed(CapabilityError),
    NotPermitted,
}

/// Something that happened outside the session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    LocationResolved(Result<LocationSample, CapabilityError>),
    /// Location permission denied; no query was issued
    LocationSkipped,
    /// Fix taken outside activation while the session runs
    LocationUpdated(LocationSample),
    CaptureResolved(CaptureOutcome),
    CaptureStopped,
    DialFailed { number: String, error: CapabilityError },
    AnswerResolved(bool),
    FallbackResolved(bool),
}

/// Work the driver must carry out next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Dial the contact, wait, then ask whether they answered
    Call { index: usize, contact: Contact },
    /// Wait, then ask whether to dial the fallback number
    OfferFallback { number: String },
    DialFallback { number: String },
}

/// State of one emergency episode
///
/// Pure bookkeeping: it never waits, dials or prompts. Every event is tagged
/// with the generation it was issued under, and events from an earlier
/// generation are dropped so a late callback cannot write into a session
/// that was reset or restarted.
#[derive(Debug, Clone)]
pub struct EmergencySession {
    generation: u64,
    state: SessionState,
    log: EmergencyLog,
    contacts: Vec<Contact>,
    current_index: usize,
    recording: bool,
    fallback_number: String,
    manual_dial: Vec<EmergencyService>,
}

impl EmergencySession {
    pub fn new(emergency: &EmergencyConfig) -> Self {
        Self {
            generation: 0,
            state: SessionState::Idle,
            log: EmergencyLog::default(),
            contacts: Vec::new(),
            current_index: 0,
            recording: false,
            fallback_number: emergency.fallback_number.clone(),
            manual_dial: emergency.manual_dial.clone(),
        }
    }

    /// Start a new episode over `contacts`; returns its generation
    pub fn activate(&mut self, contacts: Vec<Contact>) -> u64 {
        self.generation += 1;
        self.state = SessionState::Activating;
        self.current_index = 0;
        self.recording = false;
        self.contacts = contacts;
        self.log.clear();
        self.log.push(
            LogLevel::Failure,
            format!(
                "EMERGENCY ACTIVATED ({})",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ),
        );

        info!(
            "Emergency session {} activated with {} contacts",
            self.generation,
            self.contacts.len()
        );
        self.generation
    }

    /// Return to idle, discarding the log; returns whether a recording was active
    pub fn deactivate(&mut self) -> bool {
        let was_recording = self.recording;

        self.generation += 1;
        self.state = SessionState::Idle;
        self.log.clear();
        self.current_index = 0;
        self.recording = false;
        self.contacts.clear();

        info!("Emergency session deactivated");
        was_recording
    }

    /// Announce the fallback or start calling contacts
    pub fn begin_escalation(&mut self, generation: u64) -> Option<Action> {
        if !self.is_current(generation) || self.state != SessionState::Activating {
            return None;
        }

        if self.contacts.is_empty() {
            self.log.warn("No emergency contacts configured");
            self.log.info("Call emergency services manually:");
            for service in &self.manual_dial {
                self.log.info(format!("{}: {}", service.name, service.number));
            }
            self.state = SessionState::AwaitingFallback;
            return Some(Action::OfferFallback {
                number: self.fallback_number.clone(),
            });
        }

        self.log.info("Starting emergency calls...");
        self.call_next_contact(0)
    }

    pub fn apply(&mut self, generation: u64, event: SessionEvent) -> Option<Action> {
        if !self.is_current(generation) {
            debug!(
                "Dropping {:?} from generation {} (current {})",
                event, generation, self.generation
            );
            return None;
        }

        match event {
            SessionEvent::LocationResolved(Ok(sample)) => {
                self.log.info(format!(
                    "Location captured: {} (accuracy {:.0} m)",
                    sample.coordinates(),
                    sample.accuracy
                ));
                None
            }
            SessionEvent::LocationResolved(Err(e)) => {
                self.log.warn(format!("Location unavailable: {}", e));
                None
            }
            SessionEvent::LocationSkipped => {
                self.log
                    .warn("Location unavailable - enable location permission");
                None
            }
            SessionEvent::LocationUpdated(sample) => {
                if self.is_active() {
                    self.log
                        .info(format!("Location updated: {}", sample.coordinates()));
                }
                None
            }
            SessionEvent::CaptureResolved(CaptureOutcome::Started { max_secs }) => {
                self.recording = true;
                self.log
                    .info(format!("Audio recording started ({} seconds)", max_secs));
                None
            }
            SessionEvent::CaptureResolved(CaptureOutcome::Failed(e)) => {
                self.log.warn(format!("Audio recording failed: {}", e));
                None
            }
            SessionEvent::CaptureResolved(CaptureOutcome::NotPermitted) => {
                self.log
                    .warn("Microphone unavailable - enable microphone permission");
                None
            }
            SessionEvent::CaptureStopped => {
                self.recording = false;
                None
            }
            SessionEvent::DialFailed { number, error } => {
                self.log.warn(format!("Could not dial {}: {}", number, error));
                None
            }
            SessionEvent::AnswerResolved(answered) => self.resolve_answer(answered),
            SessionEvent::FallbackResolved(confirmed) => self.resolve_fallback(confirmed),
        }
    }

    fn call_next_contact(&mut self, index: usize) -> Option<Action> {
        let Some(contact) = self.contacts.get(index).cloned() else {
            self.log.push(LogLevel::Failure, "Could not reach any contact");
            self.state = SessionState::Finished(Outcome::Exhausted);
            info!("Escalation exhausted after {} contacts", self.contacts.len());
            return None;
        };

        self.current_index = index;
        self.state = SessionState::Escalating { index };
        self.log
            .info(format!("Calling {} ({})...", contact.name, contact.phone));

        Some(Action::Call { index, contact })
    }

    fn resolve_answer(&mut self, answered: bool) -> Option<Action> {
        let SessionState::Escalating { index } = self.state else {
            return None;
        };
        let name = self.contacts[index].name.clone();

        if answered {
            self.log
                .push(LogLevel::Success, format!("{} answered the call", name));
            self.log
                .push(LogLevel::Success, "Emergency reported successfully");
            self.state = SessionState::Finished(Outcome::Answered { index });
            info!("Contact {} answered", index);
            None
        } else {
            self.log
                .push(LogLevel::Failure, format!("{} did not answer", name));
            self.call_next_contact(index + 1)
        }
    }

    fn resolve_fallback(&mut self, confirmed: bool) -> Option<Action> {
        if self.state != SessionState::AwaitingFallback {
            return None;
        }

        let number = self.fallback_number.clone();
        if confirmed {
            self.log.info(format!("Dialing {}", number));
            self.state = SessionState::Finished(Outcome::FallbackDialed);
            Some(Action::DialFallback { number })
        } else {
            self.log
                .info(format!("Automatic call to {} declined", number));
            self.state = SessionState::Finished(Outcome::FallbackDeclined);
            None
        }
    }

    pub fn is_current(&self, generation: u64) -> bool {
        generation == self.generation
    }

    pub fn is_active(&self) -> bool {
        self.state != SessionState::Idle
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn log(&self) -> &EmergencyLog {
        &self.log
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// Contact being (or last) called
    pub fn current_contact(&self) -> Option<&Contact> {
        match self.state {
            SessionState::Escalating { .. } | SessionState::Finished(Outcome::Answered { .. }) => {
                self.contacts.get(self.current_index)
            }
            _ => None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }
}
