//! In-memory diagnostics sink.
//!
//! The shell owns one [`Diagnostics`] instance and hands clones of it to the
//! components that report user-visible events. Records are kept in a bounded
//! ring so the `logs` view can show recent history, and each record is also
//! forwarded to `tracing`.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local};
use tracing::Level;

pub const DEFAULT_CAPACITY: usize = 1000;

#[derive(Debug, Clone)]
pub struct LogRecord {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub message: String,
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {:<5} {}",
            self.timestamp.format("%H:%M:%S%.3f"),
            self.level.as_str(),
            self.message
        )
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    records: Arc<Mutex<VecDeque<LogRecord>>>,
    capacity: usize,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Diagnostics {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity,
        }
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.record(Level::DEBUG, message.into());
    }

    pub fn info(&self, message: impl Into<String>) {
        self.record(Level::INFO, message.into());
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.record(Level::WARN, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.record(Level::ERROR, message.into());
    }

    pub fn record(&self, level: Level, message: String) {
        if level == Level::ERROR {
            tracing::error!(target: "diagnostics", "{message}");
        } else if level == Level::WARN {
            tracing::warn!(target: "diagnostics", "{message}");
        } else if level == Level::INFO {
            tracing::info!(target: "diagnostics", "{message}");
        } else if level == Level::DEBUG {
            tracing::debug!(target: "diagnostics", "{message}");
        } else {
            tracing::trace!(target: "diagnostics", "{message}");
        }

        let mut records = match self.records.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if records.len() == self.capacity {
            records.pop_front();
        }
        records.push_back(LogRecord {
            timestamp: Local::now(),
            level,
            message,
        });
    }

    /// Snapshot of the retained records, oldest first.
    pub fn records(&self) -> Vec<LogRecord> {
        match self.records.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Records at or above `min_level` severity, rendered one per line.
    pub fn render(&self, min_level: Level) -> String {
        self.records()
            .iter()
            .filter(|r| r.level <= min_level)
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        match self.records.lock() {
            Ok(mut guard) => guard.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }
}
