//! Run log
//!
//! Every line the pipeline reports goes through [`RunLog`]: it is emitted
//! via `tracing` for the console and kept in memory so the finalizer can
//! persist the complete log. Error lines are additionally kept in a separate
//! error-only log.
//!
//! Events emitted directly through `tracing` elsewhere (retries, throttling,
//! startup lines) reach the log through [`super::console::ConsoleCapture`]
//! and [`RunLog::absorb`].

use crate::models::EntityKind;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// `tracing` target of events emitted by [`RunLog`] itself
pub const RUN_LOG_TARGET: &str = "storybridge_migrate::run_log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => f.write_str("DEBUG"),
            LogLevel::Info => f.write_str("INFO"),
            LogLevel::Warn => f.write_str("WARN"),
            LogLevel::Error => f.write_str("ERROR"),
        }
    }
}

/// One log line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// `2025-01-01T00:00:00.000Z [WARN] message`
    pub fn render(&self) -> String {
        format!(
            "{} [{}] {}",
            self.at.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level,
            self.message
        )
    }
}

/// Accumulated log of one run
#[derive(Debug, Default, Clone)]
pub struct RunLog {
    entries: Vec<LogEntry>,
    errors: Vec<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!(target: RUN_LOG_TARGET, "{}", message);
        self.push(LogLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(target: RUN_LOG_TARGET, "{}", message);
        self.push(LogLevel::Warn, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(target: RUN_LOG_TARGET, "{}", message);
        let entry = self.push(LogLevel::Error, message);
        self.errors.push(entry);
    }

    /// Error tied to one source record
    pub fn record_error(&mut self, kind: EntityKind, record_id: &str, error: &dyn fmt::Display) {
        self.error(format!("[{} {}] {}", kind, record_id, error));
    }

    fn push(&mut self, level: LogLevel, message: String) -> LogEntry {
        let entry = LogEntry {
            at: Utc::now(),
            level,
            message,
        };
        self.entries.push(entry.clone());
        entry
    }

    /// Merge entries captured from the console, keeping timestamp order
    ///
    /// Captured entries are not re-emitted; they have already been printed.
    pub fn absorb(&mut self, captured: Vec<LogEntry>) {
        if captured.is_empty() {
            return;
        }
        for entry in captured {
            if entry.level == LogLevel::Error {
                self.errors.push(entry.clone());
            }
            self.entries.push(entry);
        }
        self.entries.sort_by_key(|entry| entry.at);
        self.errors.sort_by_key(|entry| entry.at);
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn errors(&self) -> &[LogEntry] {
        &self.errors
    }

    /// Whole log rendered one entry per line
    pub fn render(&self) -> String {
        render_entries(&self.entries)
    }

    /// Error-only log rendered one entry per line
    pub fn render_errors(&self) -> String {
        render_entries(&self.errors)
    }
}

fn render_entries(entries: &[LogEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str(&entry.render());
        out.push('\n');
    }
    out
}
