use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Success,
    Failure,
}

/// One human-readable line of an emergency session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub text: String,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let marker = match self.level {
            LogLevel::Info => "-",
            LogLevel::Warning => "!",
            LogLevel::Success => "+",
            LogLevel::Failure => "x",
        };
        write!(f, "[{}] {} {}", self.at.format("%H:%M:%S"), marker, self.text)
    }
}

/// Append-only session log; only cleared as a whole
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct EmergencyLog {
    entries: Vec<LogEntry>,
}

impl EmergencyLog {
    pub fn push(&mut self, level: LogLevel, text: impl Into<String>) {
        self.entries.push(LogEntry {
            at: Utc::now(),
            level,
            text: text.into(),
        });
    }

    pub fn info(&mut self, text: impl Into<String>) {
        self.push(LogLevel::Info, text);
    }

    pub fn warn(&mut self, text: impl Into<String>) {
        self.push(LogLevel::Warning, text);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entry texts in order
    pub fn lines(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.text.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
