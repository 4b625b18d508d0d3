use crate::gui_bridge::model::StatusModel;
use crate::workflow::command::{Command, OperatorDesk};
use crate::workflow::config::SenderConfig;
use anyhow::Context;
use chrono::Utc;
use log::{debug, error, info, warn};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use trackcore::controller::{quick_fill, TimerKind};
use trackcore::prelude::Publisher;
use trackcore::telemetry::{LogManager, PublishMetrics};
use trackcore::wire::{encode, Compression, WireBatch, WireRecord};
use trackcore::{ControllerState, Effect, Event, MotionController, OperatorForm};

pub type SharedStatus = Arc<RwLock<StatusModel>>;

#[derive(Default)]
struct Timers {
    simulation: Option<Interval>,
    publish: Option<Interval>,
    elapsed: Option<Interval>,
}

impl Timers {
    fn slot(&mut self, timer: TimerKind) -> &mut Option<Interval> {
        match timer {
            TimerKind::Simulation => &mut self.simulation,
            TimerKind::Publish => &mut self.publish,
            TimerKind::Elapsed => &mut self.elapsed,
        }
    }

    /// First expiry one period from now.
    fn start(&mut self, timer: TimerKind, period: Duration) {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        *self.slot(timer) = Some(interval);
    }

    fn stop(&mut self, timer: TimerKind) {
        *self.slot(timer) = None;
    }
}

async fn expiry(slot: &mut Option<Interval>) {
    match slot {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

enum Wake {
    Timer(TimerKind),
    Command(Command),
    Closed,
}

async fn next_wake(timers: &mut Timers, commands: &mut UnboundedReceiver<Command>) -> Wake {
    let Timers {
        simulation,
        publish,
        elapsed,
    } = timers;
    tokio::select! {
        biased;
        command = commands.recv() => command.map(Wake::Command).unwrap_or(Wake::Closed),
        _ = expiry(simulation) => Wake::Timer(TimerKind::Simulation),
        _ = expiry(publish) => Wake::Timer(TimerKind::Publish),
        _ = expiry(elapsed) => Wake::Timer(TimerKind::Elapsed),
    }
}

/// Owns the controller, its timers and the publisher; feeds operator
/// commands and timer expiries to the controller one at a time.
pub struct SenderRunner<P: Publisher> {
    controller: MotionController,
    desk: OperatorDesk,
    publisher: P,
    topic: String,
    compression: Compression,
    default_interval: String,
    timers: Timers,
    status: SharedStatus,
    metrics: PublishMetrics,
    logs: LogManager,
    last_published: Option<WireRecord>,
}

impl<P: Publisher> SenderRunner<P> {
    pub fn new(config: &SenderConfig, publisher: P) -> anyhow::Result<Self> {
        let controller = MotionController::new(config.identity.clone(), config.assembler.clone())
            .context("validating identity templates")?;
        let form = OperatorForm::with_publish_interval(config.interval_text());
        Ok(Self {
            controller,
            desk: OperatorDesk::new(form, config.confirm_association),
            publisher,
            topic: config.topic.clone(),
            compression: config.compression,
            default_interval: config.interval_text(),
            timers: Timers::default(),
            status: Arc::new(RwLock::new(StatusModel::default())),
            metrics: PublishMetrics::new(),
            logs: LogManager::with_capacity("sender", config.log_history),
            last_published: None,
        })
    }

    pub fn with_form(mut self, form: OperatorForm) -> Self {
        self.desk.form = form;
        self.refresh_status();
        self
    }

    #[cfg(test)]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.controller = self.controller.with_seed(seed);
        self
    }

    pub fn status(&self) -> SharedStatus {
        self.status.clone()
    }

    #[cfg(test)]
    pub fn controller(&self) -> &MotionController {
        &self.controller
    }

    #[cfg(test)]
    pub fn desk(&self) -> &OperatorDesk {
        &self.desk
    }

    #[cfg(test)]
    pub fn publisher(&self) -> &P {
        &self.publisher
    }

    /// Serves commands and timers until `Shutdown` or the channel closes.
    pub async fn run(&mut self, mut commands: UnboundedReceiver<Command>) {
        self.refresh_status();
        loop {
            match next_wake(&mut self.timers, &mut commands).await {
                Wake::Timer(timer) => {
                    self.dispatch(timer.event());
                }
                Wake::Command(Command::Shutdown) | Wake::Closed => break,
                Wake::Command(command) => self.apply(command),
            }
        }
        if self.controller.state() != ControllerState::Idle {
            warn!(
                "stopping with a track still open ({:?})",
                self.controller.state()
            );
        }
        info!("runner stopped");
    }

    /// Feeds one event to the controller and executes the resulting effects
    /// in order.
    pub fn dispatch(&mut self, event: Event) -> ControllerState {
        if event == Event::Start {
            self.desk.invalid.clear();
        }
        let now_ms = Utc::now().timestamp_millis().max(0) as u64;
        let transition = self.controller.handle(event, &mut self.desk, now_ms);
        for effect in transition.effects {
            self.execute(effect);
        }
        self.refresh_status();
        transition.state
    }

    pub fn apply(&mut self, command: Command) {
        debug!("command {:?}", command);
        match command {
            Command::Start => {
                self.dispatch(Event::Start);
            }
            Command::PauseResume => {
                self.dispatch(Event::PauseResume);
            }
            Command::Terminate { confirm } => {
                self.desk.confirm = confirm;
                self.dispatch(Event::Terminate);
            }
            Command::SetField { field, value } => {
                if let Err(err) = self.desk.form.set_text(field, value) {
                    self.logs.warn(&err.to_string());
                }
            }
            Command::SetCourse { point } => {
                if let Err(err) = self.desk.form.set_course(point) {
                    self.logs.warn(&err.to_string());
                }
            }
            Command::SetOptions(options) => self.desk.apply_options(options),
            Command::LoadForm { form } => {
                if self.controller.state() == ControllerState::Idle {
                    self.desk.form = form;
                    self.desk.invalid.clear();
                } else {
                    self.logs.warn("the form can only be replaced while idle");
                }
            }
            Command::QuickFill { text } => {
                let outcome = quick_fill(&mut self.desk.form, &text);
                if outcome.filled.is_empty() {
                    self.logs.record("quick fill: nothing recognised");
                } else {
                    self.logs
                        .record(&format!("quick fill: {}", outcome.filled.join(", ")));
                }
                if !outcome.skipped.is_empty() {
                    self.logs
                        .warn(&format!("quick fill skipped locked {}", outcome.skipped.join(", ")));
                }
            }
            Command::Clear => {
                if self.controller.state() == ControllerState::Idle {
                    self.desk.form.reset();
                    self.desk.form.publish_interval = self.default_interval.clone();
                    self.desk.invalid.clear();
                    self.logs.record("form cleared");
                } else {
                    self.logs.warn("clear is only available while idle");
                }
            }
            Command::Shutdown => {}
        }
        self.refresh_status();
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Publish(record) => self.publish(record),
            Effect::StartTimer { timer, period } => self.timers.start(timer, period),
            Effect::StopTimer(timer) => self.timers.stop(timer),
            Effect::Refresh(kinematics) => self.desk.form.show_kinematics(&kinematics),
            Effect::FlagInvalid(fields) => {
                let labels: Vec<&str> = fields.iter().map(|f| f.label()).collect();
                self.logs
                    .warn(&format!("check required fields: {}", labels.join(", ")));
                self.desk.invalid = fields;
            }
            Effect::LockFields(fields) => {
                self.desk.form.lock(&fields);
                self.logs
                    .record("awaiting association; position and speed are locked");
            }
            Effect::UnlockFields => self.desk.form.unlock_all(),
            Effect::IdentityAssigned(generated) => {
                let mut parts = Vec::new();
                if let Some(id) = generated.id {
                    parts.push(format!("ID {}", id));
                }
                if let Some(mobile_id) = generated.mobile_id {
                    parts.push(format!("MMSI {}", mobile_id));
                }
                if let Some(satellite_id) = generated.satellite_id {
                    parts.push(format!("satellite ID {}", satellite_id));
                }
                self.logs.record(&format!("generated {}", parts.join(", ")));
            }
            Effect::Notify(message) => self.logs.warn(&message),
        }
    }

    fn publish(&mut self, record: WireRecord) {
        let status = record.track_status();
        let track_id = record.id;
        let batch = WireBatch {
            records: vec![record],
        };
        let payload = match encode(&batch, self.compression) {
            Ok(payload) => payload,
            Err(err) => {
                self.metrics.record_failed();
                error!("track {} not encoded: {}", track_id, err);
                self.logs.warn(&format!("encode failed: {}", err));
                return;
            }
        };
        match self.publisher.publish(&self.topic, &payload) {
            Ok(ack) => {
                self.metrics.record_published(status, &ack);
                self.logs.record(&format!(
                    "sent {:?} for track {} ({} bytes)",
                    status.unwrap_or_default(),
                    track_id,
                    ack.bytes
                ));
                self.last_published = batch.records.into_iter().next();
            }
            Err(err) => {
                self.metrics.record_failed();
                self.logs.warn(&format!("publish failed: {}", err));
            }
        }
    }

    fn refresh_status(&self) {
        let Ok(mut model) = self.status.write() else {
            error!("status model lock poisoned");
            return;
        };
        let snapshot = self.controller.snapshot();
        *model = StatusModel {
            state: self.controller.state(),
            track_id: snapshot.map(|s| s.id),
            kinematics: snapshot.map(|s| s.kinematics),
            elapsed_secs: self.controller.elapsed_secs(),
            publish_interval_ms: self.controller.publish_interval().as_millis() as u64,
            form: self.desk.form.clone(),
            invalid_fields: self.desk.invalid.clone(),
            locked_fields: self.desk.form.locked_fields(),
            metrics: self.metrics.snapshot(),
            last_published: self.last_published.clone(),
            log: self.logs.entries(),
        };
    }
}
