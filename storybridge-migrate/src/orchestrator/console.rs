//! Console capture
//!
//! A `tracing_subscriber` layer that records every event passing the
//! subscriber's filter, so lines printed to the console outside [`RunLog`]
//! (lock retries, source throttling, startup banners) also land in the run
//! log artifact. Events emitted by [`RunLog`] itself are skipped; the run
//! log already holds them.
//!
//! [`RunLog`]: super::run_log::RunLog

use super::run_log::{LogEntry, LogLevel, RUN_LOG_TARGET};
use chrono::Utc;
use std::fmt::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::Layer;

/// Shared buffer of captured console events
///
/// Cloning yields a handle onto the same buffer: install one clone as a
/// layer and hand another to the orchestrator, which drains it when a run
/// finishes.
#[derive(Debug, Clone, Default)]
pub struct ConsoleCapture {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl ConsoleCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every entry captured so far
    pub fn drain(&self) -> Vec<LogEntry> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<LogEntry>> {
        // A panic while pushing cannot leave the Vec half-written
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<S> Layer<S> for ConsoleCapture
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() == RUN_LOG_TARGET {
            return;
        }

        let mut visitor = EventVisitor::default();
        event.record(&mut visitor);

        let entry = LogEntry {
            at: Utc::now(),
            level: level_of(metadata.level()),
            message: format!("{}: {}{}", metadata.target(), visitor.message, visitor.fields),
        };
        self.lock().push(entry);
    }
}

fn level_of(level: &Level) -> LogLevel {
    if *level == Level::ERROR {
        LogLevel::Error
    } else if *level == Level::WARN {
        LogLevel::Warn
    } else if *level == Level::INFO {
        LogLevel::Info
    } else {
        LogLevel::Debug
    }
}

/// Renders an event like the fmt layer: message, then ` key=value` pairs
#[derive(Default)]
struct EventVisitor {
    message: String,
    fields: String,
}

impl Visit for EventVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}
