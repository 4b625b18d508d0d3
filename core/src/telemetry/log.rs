use chrono::{DateTime, Utc};
use log::{info, warn, Level};
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::Mutex;

const DEFAULT_CAPACITY: usize = 200;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: String,
    pub message: String,
}

/// Forwards to the `log` facade and keeps the most recent lines for the
/// operator surface.
pub struct LogManager {
    component: String,
    capacity: usize,
    history: Mutex<VecDeque<LogEntry>>,
}

impl LogManager {
    pub fn new(component: impl Into<String>) -> Self {
        Self::with_capacity(component, DEFAULT_CAPACITY)
    }

    pub fn with_capacity(component: impl Into<String>, capacity: usize) -> Self {
        Self {
            component: component.into(),
            capacity: capacity.max(1),
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn record(&self, message: &str) {
        info!("[{}] {}", self.component, message);
        self.push(Level::Info, message);
    }

    pub fn warn(&self, message: &str) {
        warn!("[{}] {}", self.component, message);
        self.push(Level::Warn, message);
    }

    fn push(&self, level: Level, message: &str) {
        if let Ok(mut history) = self.history.lock() {
            if history.len() == self.capacity {
                history.pop_front();
            }
            history.push_back(LogEntry {
                at: Utc::now(),
                level: level.to_string(),
                message: message.to_string(),
            });
        }
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.history
            .lock()
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new("sender")
    }
}
