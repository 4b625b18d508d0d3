use crate::controller::form::FormField;
use crate::target::identity::GeneratedIdentity;
use crate::target::snapshot::Kinematics;
use crate::wire::record::WireRecord;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    #[default]
    Idle,
    Running,
    Paused,
    AwaitingAssociation,
}

/// Inputs to the state machine: operator actions and timer expiries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Event {
    Start,
    PauseResume,
    Terminate,
    SimulationTick,
    PublishTick,
    ElapsedTick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    Simulation,
    Publish,
    Elapsed,
}

impl TimerKind {
    pub fn event(&self) -> Event {
        match self {
            Self::Simulation => Event::SimulationTick,
            Self::Publish => Event::PublishTick,
            Self::Elapsed => Event::ElapsedTick,
        }
    }
}

/// Side effects requested by a transition, executed in order by the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Publish(WireRecord),
    StartTimer { timer: TimerKind, period: Duration },
    StopTimer(TimerKind),
    /// Mirror the simulated kinematics into the operator-visible fields.
    Refresh(Kinematics),
    FlagInvalid(Vec<FormField>),
    LockFields(Vec<FormField>),
    UnlockFields,
    IdentityAssigned(GeneratedIdentity),
    Notify(String),
}

/// Result of handling one event.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub state: ControllerState,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn published(&self) -> impl Iterator<Item = &WireRecord> {
        self.effects.iter().filter_map(|effect| match effect {
            Effect::Publish(record) => Some(record),
            _ => None,
        })
    }
}
