pub mod log;
pub mod metrics;

pub use log::{LogEntry, LogManager};
pub use metrics::{MetricsSnapshot, PublishMetrics};
