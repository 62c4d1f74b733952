use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::permission::PermissionState;
use crate::config::FixedPosition;
use crate::error::{Capability, CapabilityError};

/// One location fix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters
    pub accuracy: f64,
    /// Capture time in milliseconds since epoch
    pub timestamp: i64,
}

impl LocationSample {
    /// `lat, lon` with six decimal places
    pub fn coordinates(&self) -> String {
        format!("{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
}

impl LocationOptions {
    pub fn precise(timeout: Duration) -> Self {
        Self {
            high_accuracy: true,
            timeout,
        }
    }

    /// Coarse fix used only to learn whether access is granted
    pub fn probe(timeout: Duration) -> Self {
        Self {
            high_accuracy: false,
            timeout,
        }
    }
}

/// Single-shot position source
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// One best-effort fix; not a stream
    async fn query_once(&self, options: LocationOptions) -> Result<LocationSample, CapabilityError>;

    /// Probe permission with a query bounded by `timeout`
    async fn check_permission(&self, timeout: Duration) -> PermissionState {
        let result = query_with_timeout(self, LocationOptions::probe(timeout)).await;
        PermissionState::from_probe(&result)
    }

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Run `query_once`, failing with `Unavailable` once `options.timeout` elapses
pub async fn query_with_timeout<P>(
    provider: &P,
    options: LocationOptions,
) -> Result<LocationSample, CapabilityError>
where
    P: LocationProvider + ?Sized,
{
    debug!(
        "Querying {} (high_accuracy={}, timeout={}ms)",
        provider.name(),
        options.high_accuracy,
        options.timeout.as_millis()
    );

    match tokio::time::timeout(options.timeout, provider.query_once(options)).await {
        Ok(result) => result,
        Err(_) => Err(CapabilityError::Unavailable(
            Capability::Location,
            format!("timed out after {}ms", options.timeout.as_millis()),
        )),
    }
}

/// Location provider reporting a configured position
///
/// Without a position it behaves like a device with no location capability.
pub struct FixedLocationProvider {
    position: Option<FixedPosition>,
    latency: Duration,
    denied: bool,
}

impl FixedLocationProvider {
    pub fn new(position: Option<FixedPosition>) -> Self {
        if let Some(p) = position {
            info!("Location fixed at {:.6}, {:.6}", p.latitude, p.longitude);
        }

        Self {
            position,
            latency: Duration::ZERO,
            denied: false,
        }
    }

    pub fn at(latitude: f64, longitude: f64, accuracy: f64) -> Self {
        Self::new(Some(FixedPosition {
            latitude,
            longitude,
            accuracy,
        }))
    }

    pub fn unavailable() -> Self {
        Self::new(None)
    }

    /// Provider that refuses every query with `PermissionDenied`
    pub fn denied() -> Self {
        Self {
            denied: true,
            ..Self::new(None)
        }
    }

    /// Delay every fix by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn query_once(&self, _options: LocationOptions) -> Result<LocationSample, CapabilityError> {
        if self.denied {
            return Err(CapabilityError::PermissionDenied(Capability::Location));
        }

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let position = self.position.ok_or_else(|| {
            CapabilityError::Unavailable(Capability::Location, "no position source".to_string())
        })?;

        Ok(LocationSample {
            latitude: position.latitude,
            longitude: position.longitude,
            accuracy: position.accuracy,
            timestamp: Utc::now().timestamp_millis(),
        })
    }

    fn name(&self) -> &str {
        "fixed-location"
    }
}
