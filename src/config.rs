use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::session::SessionConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub emergency: EmergencyConfig,
    pub links: LinksConfig,
    pub device: DeviceConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// JSON file backing the key-value store
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "safealert.json".to_string(),
        }
    }
}

impl StorageConfig {
    /// Storage path with `~` and environment variables expanded
    pub fn resolved_path(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.path)
            .with_context(|| format!("Failed to expand storage path: {}", self.path))?;
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

/// A dialable public emergency service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyService {
    pub name: String,
    pub number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub urgent: bool,
}

impl EmergencyService {
    fn new(name: &str, number: &str, description: &str, urgent: bool) -> Self {
        Self {
            name: name.to_string(),
            number: number.to_string(),
            description: description.to_string(),
            urgent,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Number offered for automatic dialing when no contacts exist
    pub fallback_number: String,
    /// Services listed in the session log when no contacts exist
    pub manual_dial: Vec<EmergencyService>,
    /// Full directory of public emergency numbers
    pub directory: Vec<EmergencyService>,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            fallback_number: "911".to_string(),
            manual_dial: vec![
                EmergencyService::new("Red Cross", "065", "", false),
                EmergencyService::new("Police", "911", "", true),
                EmergencyService::new("Fire department", "911", "", true),
            ],
            directory: vec![
                EmergencyService::new("Emergency", "911", "Police / Fire / Paramedics", true),
                EmergencyService::new("Red Cross", "065", "Ambulance service", false),
                EmergencyService::new("Anonymous report", "089", "Anonymous crime reporting", false),
                EmergencyService::new("Lifeline", "078", "Suicide prevention line", false),
            ],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinksConfig {
    pub map_base_url: String,
    pub support_email: String,
}

impl Default for LinksConfig {
    fn default() -> Self {
        Self {
            map_base_url: "https://www.google.com/maps".to_string(),
            support_email: "support@safealert.com".to_string(),
        }
    }
}

/// Fixed position reported by the built-in location provider
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FixedPosition {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Position fix to report; location is unavailable when unset
    pub location: Option<FixedPosition>,
    /// Whether an audio input device is present
    pub microphone: bool,
    /// Sample rate of the built-in microphone
    pub sample_rate: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            location: None,
            microphone: true,
            sample_rate: 16000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

impl Config {
    /// Load configuration from an optional file plus `SAFEALERT__*` overrides
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("SAFEALERT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to read configuration: {}", path))?;

        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = Config::default();
        assert_eq!(cfg.emergency.fallback_number, "911");
        assert_eq!(cfg.emergency.manual_dial.len(), 3);
        assert_eq!(cfg.emergency.manual_dial[0].number, "065");
        assert_eq!(cfg.http.port, 8080);
        assert!(cfg.device.location.is_none());
    }

    #[test]
    fn load_reads_toml_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("safealert.toml");
        std::fs::write(
            &path,
            r#"
[storage]
path = "/tmp/contacts.json"

[session]
answer_delay_ms = 100

[device.location]
latitude = 19.4326
longitude = -99.1332
accuracy = 12.0
"#,
        )
        .unwrap();

        let base = path.with_extension("");
        let cfg = Config::load(base.to_str().unwrap()).unwrap();

        assert_eq!(cfg.storage.path, "/tmp/contacts.json");
        assert_eq!(cfg.session.answer_delay_ms, 100);
        assert_eq!(cfg.session.fallback_delay_ms, 5000);
        let position = cfg.device.location.unwrap();
        assert_eq!(position.accuracy, 12.0);
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let cfg = Config::load("/nonexistent/safealert").unwrap();
        assert_eq!(cfg.storage.path, "safealert.json");
        assert_eq!(cfg.session.recording_ms, 30000);
        assert_eq!(cfg.session.permission_probe_ms, 5000);
    }
}
