use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio::task::{AbortHandle, JoinHandle};
use tracing::{debug, error, info, warn};

use super::config::SessionConfig;
use super::machine::{Action, CaptureOutcome, EmergencySession, SessionEvent};
use super::snapshot::SessionSnapshot;
use crate::audio::{AudioArtifact, AudioCapture, CaptureHandle};
use crate::capability::{
    map_url, query_with_timeout, AnswerDetector, AnswerPrompt, Dialer, LocationOptions,
    LocationProvider, LocationSample, PermissionState, PermissionStatus,
};
use crate::config::{Config, LinksConfig};
use crate::contacts::ContactStore;
use crate::error::{AlertError, Capability, CapabilityError};

/// Device capabilities the controller drives
#[derive(Clone)]
pub struct Capabilities {
    pub location: Arc<dyn LocationProvider>,
    pub audio: Arc<dyn AudioCapture>,
    pub dialer: Arc<dyn Dialer>,
    pub answers: Arc<dyn AnswerDetector>,
}

/// Result of toggling the microphone test
#[derive(Debug)]
pub enum TestRecording {
    Started(CaptureHandle),
    Stopped(Option<AudioArtifact>),
}

struct Inner {
    config: SessionConfig,
    links: LinksConfig,
    contacts: Arc<ContactStore>,
    caps: Capabilities,
    session: Mutex<EmergencySession>,
    /// Capture started by the current emergency session
    capture: Mutex<Option<CaptureHandle>>,
    /// Capture started by the microphone test
    test_capture: Mutex<Option<CaptureHandle>>,
    permissions: RwLock<PermissionStatus>,
    last_location: RwLock<Option<LocationSample>>,
    /// Held for the whole of `activate` and `deactivate`
    lifecycle: Mutex<()>,
    /// Join handles of session tasks; `wait_idle` takes these
    tasks: Mutex<Vec<JoinHandle<()>>>,
    /// Abort handles of the same tasks, kept until teardown
    aborts: Mutex<Vec<AbortHandle>>,
}

/// Runs emergency sessions
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct EmergencyController {
    inner: Arc<Inner>,
}

impl EmergencyController {
    pub fn new(config: &Config, contacts: Arc<ContactStore>, caps: Capabilities) -> Self {
        Self {
            inner: Arc::new(Inner {
                config: config.session.clone(),
                links: config.links.clone(),
                contacts,
                caps,
                session: Mutex::new(EmergencySession::new(&config.emergency)),
                capture: Mutex::new(None),
                test_capture: Mutex::new(None),
                permissions: RwLock::new(PermissionStatus::default()),
                last_location: RwLock::new(None),
                lifecycle: Mutex::new(()),
                tasks: Mutex::new(Vec::new()),
                aborts: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn contacts(&self) -> &Arc<ContactStore> {
        &self.inner.contacts
    }

    /// Probe both capabilities and record their permission state
    pub async fn refresh_permissions(&self) -> PermissionStatus {
        let location = self
            .inner
            .caps
            .location
            .check_permission(self.inner.config.permission_probe())
            .await;
        let microphone = self.inner.caps.audio.request_permission().await;

        let status = PermissionStatus {
            location,
            microphone,
        };
        *self.inner.permissions.write().await = status;

        info!(
            "Permissions: location={:?}, microphone={:?}",
            status.location, status.microphone
        );
        status
    }

    pub async fn permissions(&self) -> PermissionStatus {
        *self.inner.permissions.read().await
    }

    /// Ask for location access with a precise fix
    pub async fn request_location_permission(&self) -> PermissionState {
        let options = LocationOptions::precise(self.inner.config.location_timeout());
        let result = query_with_timeout(self.inner.caps.location.as_ref(), options).await;
        let state = PermissionState::from_probe(&result);

        if let Ok(sample) = result {
            *self.inner.last_location.write().await = Some(sample);
        }
        self.inner.permissions.write().await.location = state;
        state
    }

    pub async fn request_microphone_permission(&self) -> PermissionState {
        let state = self.inner.caps.audio.request_permission().await;
        self.inner.permissions.write().await.microphone = state;
        state
    }

    /// Start an emergency episode
    ///
    /// Capability failures end up as warnings in the session log; this never
    /// fails. An episode already running is torn down first. Concurrent
    /// calls run one after the other.
    pub async fn activate(&self) -> SessionSnapshot {
        let _lifecycle = self.inner.lifecycle.lock().await;

        if self.inner.session.lock().await.is_active() {
            info!("Restarting active emergency session");
            self.teardown().await;
        }

        let contacts = self.inner.contacts.list_contacts();
        let generation = self.inner.session.lock().await.activate(contacts);
        let permissions = self.permissions().await;

        if permissions.location == PermissionState::Denied {
            self.apply(generation, SessionEvent::LocationSkipped).await;
        } else {
            self.spawn_location_query(generation).await;
        }

        let outcome = if permissions.microphone.is_granted() {
            let max_duration = self.inner.config.recording();
            match self.inner.caps.audio.start_capture(max_duration).await {
                Ok(handle) => {
                    *self.inner.capture.lock().await = Some(handle.clone());
                    self.spawn_capture_timer(generation, handle).await;
                    CaptureOutcome::Started {
                        max_secs: max_duration.as_secs(),
                    }
                }
                Err(e) => {
                    warn!("Failed to start emergency recording: {}", e);
                    CaptureOutcome::Failed(e)
                }
            }
        } else {
            CaptureOutcome::NotPermitted
        };
        self.apply(generation, SessionEvent::CaptureResolved(outcome))
            .await;

        let first = self.inner.session.lock().await.begin_escalation(generation);
        if first.is_some() {
            let driver = self.clone();
            self.track(tokio::spawn(driver.drive(generation, first)))
                .await;
        }

        self.snapshot().await
    }

    /// End the episode from any state
    pub async fn deactivate(&self) -> SessionSnapshot {
        let _lifecycle = self.inner.lifecycle.lock().await;
        self.teardown().await;
        self.snapshot().await
    }

    async fn teardown(&self) {
        let was_recording = self.inner.session.lock().await.deactivate();

        let aborts: Vec<_> = self.inner.aborts.lock().await.drain(..).collect();
        for task in &aborts {
            task.abort();
        }
        self.inner.tasks.lock().await.clear();
        debug!("Cancelled {} session tasks", aborts.len());

        let handle = self.inner.capture.lock().await.take();
        if let Some(handle) = handle {
            if let Some(artifact) = self.inner.caps.audio.stop_capture(&handle).await {
                info!(
                    "Discarding emergency recording ({:.1}s)",
                    artifact.duration_seconds()
                );
            }
        } else if was_recording {
            warn!("Session was recording but no capture handle was held");
        }
    }

    /// Wait until every outstanding session task has finished
    ///
    /// Deactivating meanwhile still cancels the tasks; they then count as
    /// finished.
    pub async fn wait_idle(&self) {
        loop {
            let tasks: Vec<_> = self.inner.tasks.lock().await.drain(..).collect();
            if tasks.is_empty() {
                return;
            }

            for result in join_all(tasks).await {
                if let Err(e) = result {
                    if !e.is_cancelled() {
                        error!("Session task panicked: {}", e);
                    }
                }
            }
        }
    }

    /// Take a fresh precise fix, logging it when a session runs
    pub async fn refresh_location(&self) -> Result<LocationSample, AlertError> {
        let options = LocationOptions::precise(self.inner.config.location_timeout());
        let sample = query_with_timeout(self.inner.caps.location.as_ref(), options).await?;

        *self.inner.last_location.write().await = Some(sample);

        let mut session = self.inner.session.lock().await;
        let generation = session.generation();
        session.apply(generation, SessionEvent::LocationUpdated(sample));

        Ok(sample)
    }

    pub async fn last_location(&self) -> Option<LocationSample> {
        *self.inner.last_location.read().await
    }

    /// Web map link for the last fix
    pub async fn map_link(&self) -> Option<String> {
        self.last_location()
            .await
            .map(|sample| map_url(&self.inner.links.map_base_url, &sample))
    }

    /// Start a short microphone test, or stop the one running
    pub async fn toggle_test_recording(&self) -> Result<TestRecording, AlertError> {
        let mut slot = self.inner.test_capture.lock().await;

        // A test that hit its limit still holds the recording until collected
        if let Some(handle) = slot.take() {
            let artifact = self.inner.caps.audio.stop_capture(&handle).await;
            return Ok(TestRecording::Stopped(artifact));
        }

        if !self.permissions().await.microphone.is_granted() {
            return Err(CapabilityError::PermissionDenied(Capability::Microphone).into());
        }

        let handle = self
            .inner
            .caps
            .audio
            .start_capture(self.inner.config.test_recording())
            .await?;
        *slot = Some(handle.clone());

        info!("Microphone test started");
        Ok(TestRecording::Started(handle))
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let permissions = self.permissions().await;
        let location = self.last_location().await;
        let session = self.inner.session.lock().await;

        SessionSnapshot {
            active: session.is_active(),
            state: session.state(),
            generation: session.generation(),
            log: session.log().entries().to_vec(),
            current_index: session.current_index(),
            current_contact: session.current_contact().cloned(),
            recording: session.is_recording(),
            permissions,
            location,
        }
    }

    async fn apply(&self, generation: u64, event: SessionEvent) -> Option<Action> {
        self.inner.session.lock().await.apply(generation, event)
    }

    async fn is_current(&self, generation: u64) -> bool {
        self.inner.session.lock().await.is_current(generation)
    }

    async fn track(&self, task: JoinHandle<()>) {
        {
            let mut aborts = self.inner.aborts.lock().await;
            aborts.retain(|a| !a.is_finished());
            aborts.push(task.abort_handle());
        }

        let mut tasks = self.inner.tasks.lock().await;
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
    }

    async fn spawn_location_query(&self, generation: u64) {
        let controller = self.clone();
        let options = LocationOptions::precise(self.inner.config.location_timeout());

        let task = tokio::spawn(async move {
            let result = query_with_timeout(controller.inner.caps.location.as_ref(), options).await;

            match &result {
                Ok(sample) => {
                    if controller.is_current(generation).await {
                        *controller.inner.last_location.write().await = Some(*sample);
                    }
                }
                Err(e) => warn!("Location query failed: {}", e),
            }

            controller
                .apply(generation, SessionEvent::LocationResolved(result))
                .await;
        });

        self.track(task).await;
    }

    /// Release the capture once its time is up
    async fn spawn_capture_timer(&self, generation: u64, handle: CaptureHandle) {
        let controller = self.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(handle.max_duration).await;

            let owned = {
                let mut slot = controller.inner.capture.lock().await;
                match slot.as_ref() {
                    Some(current) if current.id == handle.id => slot.take(),
                    _ => None,
                }
            };

            if let Some(handle) = owned {
                if let Some(artifact) = controller.inner.caps.audio.stop_capture(&handle).await {
                    info!(
                        "Emergency recording finished ({:.1}s)",
                        artifact.duration_seconds()
                    );
                }
                controller
                    .apply(generation, SessionEvent::CaptureStopped)
                    .await;
            }
        });

        self.track(task).await;
    }

    async fn dial(&self, generation: u64, number: &str) {
        if let Err(error) = self.inner.caps.dialer.dial(number).await {
            warn!("Dial to {} failed: {}", number, error);
            self.apply(
                generation,
                SessionEvent::DialFailed {
                    number: number.to_string(),
                    error,
                },
            )
            .await;
        }
    }

    /// Carry out actions until the machine has nothing left to do
    async fn drive(self, generation: u64, mut next: Option<Action>) {
        while let Some(action) = next.take() {
            next = match action {
                Action::Call { index, contact } => {
                    info!("Calling contact {} ({})", index, contact.name);
                    self.dial(generation, &contact.phone).await;

                    tokio::time::sleep(self.inner.config.answer_delay()).await;
                    if !self.is_current(generation).await {
                        return;
                    }

                    let prompt = AnswerPrompt::ContactAnswered {
                        name: contact.name,
                        phone: contact.phone,
                    };
                    let answered = self.inner.caps.answers.confirm(&prompt).await;
                    self.apply(generation, SessionEvent::AnswerResolved(answered))
                        .await
                }
                Action::OfferFallback { number } => {
                    tokio::time::sleep(self.inner.config.fallback_delay()).await;
                    if !self.is_current(generation).await {
                        return;
                    }

                    let prompt = AnswerPrompt::DialFallback { number };
                    let confirmed = self.inner.caps.answers.confirm(&prompt).await;
                    self.apply(generation, SessionEvent::FallbackResolved(confirmed))
                        .await
                }
                Action::DialFallback { number } => {
                    self.dial(generation, &number).await;
                    None
                }
            };
        }

        debug!("Session {} driver finished", generation);
    }
}
