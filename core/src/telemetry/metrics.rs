use crate::prelude::PublishAck;
use crate::target::class::TrackStatus;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

/// Counters for the publish path.
pub struct PublishMetrics {
    inner: Mutex<MetricsSnapshot>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub published: usize,
    pub failed: usize,
    pub deletes: usize,
    pub bytes: usize,
}

impl PublishMetrics {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(MetricsSnapshot::default()),
        }
    }

    pub fn record_published(&self, status: Option<TrackStatus>, ack: &PublishAck) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.published += 1;
            metrics.bytes += ack.bytes;
            if status == Some(TrackStatus::Delete) {
                metrics.deletes += 1;
            }
        }
    }

    pub fn record_failed(&self) {
        if let Ok(mut metrics) = self.inner.lock() {
            metrics.failed += 1;
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        self.inner
            .lock()
            .map(|metrics| *metrics)
            .unwrap_or_default()
    }
}

impl Default for PublishMetrics {
    fn default() -> Self {
        Self::new()
    }
}
