use serde::Serialize;
use trackcore::controller::FormField;
use trackcore::target::Kinematics;
use trackcore::telemetry::{LogEntry, MetricsSnapshot};
use trackcore::wire::WireRecord;
use trackcore::{ControllerState, OperatorForm};

/// What the operator surface shows: controller state, the live form and
/// the publish counters.
#[derive(Debug, Clone, Serialize, Default)]
pub struct StatusModel {
    pub state: ControllerState,
    pub track_id: Option<u64>,
    pub kinematics: Option<Kinematics>,
    pub elapsed_secs: u64,
    pub publish_interval_ms: u64,
    pub form: OperatorForm,
    pub invalid_fields: Vec<FormField>,
    pub locked_fields: Vec<FormField>,
    pub metrics: MetricsSnapshot,
    pub last_published: Option<WireRecord>,
    pub log: Vec<LogEntry>,
}
