use crate::assembler::{AssemblerConfig, MessageAssembler};
use crate::controller::form::{FormField, OperatorForm, DEFAULT_PUBLISH_INTERVAL};
use crate::controller::state::{ControllerState, Effect, Event, TimerKind, Transition, TICK};
use crate::kinematics::projector::normalize_course;
use crate::prelude::{ControllerError, IdentityError, OperatorInput};
use crate::target::class::TrackStatus;
use crate::target::identity::{ensure_identity, IdentityPolicy};
use crate::target::snapshot::{Kinematics, TargetSnapshot};
use log::{debug, error, info, warn};
use rand::{rngs::StdRng, SeedableRng};
use std::time::Duration;

/// Drives the start / pause / resume / terminate / associate lifecycle of the
/// single simulated target.
pub struct MotionController {
    state: ControllerState,
    snapshot: Option<TargetSnapshot>,
    elapsed_secs: u64,
    publish_interval: Duration,
    identity: IdentityPolicy,
    assembler: MessageAssembler,
    rng: StdRng,
}

impl MotionController {
    pub fn new(identity: IdentityPolicy, assembler: AssemblerConfig) -> Result<Self, IdentityError> {
        identity.validate()?;
        Ok(Self {
            state: ControllerState::Idle,
            snapshot: None,
            elapsed_secs: 0,
            publish_interval: DEFAULT_PUBLISH_INTERVAL,
            identity,
            assembler: MessageAssembler::new(assembler),
            rng: StdRng::from_entropy(),
        })
    }

    /// Deterministic identifier generation.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn snapshot(&self) -> Option<&TargetSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn elapsed_secs(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn publish_interval(&self) -> Duration {
        self.publish_interval
    }

    /// Applies one event. On failure the state is left untouched and the
    /// cause is reported through the returned effects.
    pub fn handle<I: OperatorInput + ?Sized>(
        &mut self,
        event: Event,
        input: &mut I,
        now_ms: u64,
    ) -> Transition {
        let mut effects = Vec::new();
        let outcome = match (self.state, event) {
            (ControllerState::Idle, Event::Start) => {
                self.open_track(input.form(), None, now_ms, &mut effects)
            }
            (ControllerState::Running, Event::PauseResume) => Ok(self.pause(&mut effects)),
            (ControllerState::Paused, Event::PauseResume) => {
                self.resume(input.form(), now_ms, &mut effects)
            }
            (ControllerState::Running | ControllerState::Paused, Event::Terminate) => {
                self.terminate(input, now_ms, &mut effects)
            }
            (ControllerState::AwaitingAssociation, Event::Start) => {
                self.associate(input.form(), now_ms, &mut effects)
            }
            (ControllerState::AwaitingAssociation, Event::Terminate) => {
                Ok(self.cancel_association(&mut effects))
            }
            (ControllerState::Running, Event::SimulationTick) => {
                self.simulate(input.form(), &mut effects)
            }
            (ControllerState::Running, Event::PublishTick) => {
                let status = input.form().status_override.unwrap_or(TrackStatus::Update);
                self.emit(status, now_ms, &mut effects)
                    .map(|_| ControllerState::Running)
            }
            (ControllerState::Paused | ControllerState::AwaitingAssociation, Event::ElapsedTick) => {
                self.elapsed_secs += 1;
                Ok(self.state)
            }
            (state, event) => {
                debug!("ignoring {:?} while {:?}", event, state);
                Ok(state)
            }
        };

        match outcome {
            Ok(next) => {
                if next != self.state {
                    info!("controller {:?} -> {:?}", self.state, next);
                }
                self.state = next;
            }
            Err(err) => {
                effects.clear();
                match &err {
                    ControllerError::Validation(validation) => {
                        debug!("{:?} refused: {}", event, validation);
                        effects.push(Effect::FlagInvalid(validation.fields.clone()));
                    }
                    ControllerError::Identity(_) => error!("{:?} failed: {}", event, err),
                    _ => warn!("{:?} aborted while {:?}: {}", event, self.state, err),
                }
                effects.push(Effect::Notify(err.to_string()));
            }
        }

        Transition {
            state: self.state,
            effects,
        }
    }

    /// Fills missing identifiers, stamps `status` and queues the record.
    fn emit(
        &mut self,
        status: TrackStatus,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) -> Result<(), ControllerError> {
        let snapshot = self.snapshot.as_mut().ok_or(ControllerError::NoOpenTrack)?;
        let generated = ensure_identity(snapshot, &self.identity, &mut self.rng)?;
        if !generated.is_empty() {
            info!("generated identifiers {:?}", generated);
            effects.push(Effect::IdentityAssigned(generated));
        }
        snapshot.status = status;
        effects.push(Effect::Publish(self.assembler.assemble(snapshot, now_ms)));
        Ok(())
    }

    fn start_timers(&self, effects: &mut Vec<Effect>) {
        effects.push(Effect::StartTimer {
            timer: TimerKind::Simulation,
            period: TICK,
        });
        effects.push(Effect::StartTimer {
            timer: TimerKind::Publish,
            period: self.publish_interval,
        });
    }

    fn open_track(
        &mut self,
        form: &OperatorForm,
        carried: Option<Kinematics>,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) -> Result<ControllerState, ControllerError> {
        let mut snapshot = form.seed_snapshot()?;
        if let Some(kinematics) = carried {
            snapshot.kinematics = kinematics;
        }
        let (interval, notice) = form.publish_interval();
        if let Some(notice) = notice {
            warn!("{}", notice);
            effects.push(Effect::Notify(notice));
        }

        let previous = self.snapshot.replace(snapshot);
        let status = form.status_override.unwrap_or(TrackStatus::New);
        if let Err(err) = self.emit(status, now_ms, effects) {
            self.snapshot = previous;
            return Err(err);
        }

        self.publish_interval = interval;
        self.elapsed_secs = 0;
        self.start_timers(effects);
        if let Some(snapshot) = &self.snapshot {
            info!(
                "track {} opened at {:.6},{:.6} ({} kn, {} deg), publishing every {:?}",
                snapshot.id,
                snapshot.kinematics.position.latitude,
                snapshot.kinematics.position.longitude,
                snapshot.kinematics.speed_knots,
                snapshot.kinematics.course_deg,
                interval
            );
            effects.push(Effect::Refresh(snapshot.kinematics));
        }
        Ok(ControllerState::Running)
    }

    fn pause(&mut self, effects: &mut Vec<Effect>) -> ControllerState {
        effects.push(Effect::StopTimer(TimerKind::Simulation));
        effects.push(Effect::StopTimer(TimerKind::Publish));
        effects.push(Effect::StartTimer {
            timer: TimerKind::Elapsed,
            period: TICK,
        });
        self.elapsed_secs = 0;
        ControllerState::Paused
    }

    /// Kinematics after the pause or association wait, using the fields the
    /// operator sees now as the baseline.
    fn recompute_after_gap(&self, form: &OperatorForm) -> Result<Kinematics, ControllerError> {
        let baseline = form.read_kinematics()?;
        let advanced = baseline.after_gap(form.ramp, self.elapsed_secs as f64);
        debug!(
            "{} s gap: {:.4} kn -> {:.4} kn",
            self.elapsed_secs, baseline.speed_knots, advanced.speed_knots
        );
        Ok(advanced)
    }

    fn resume(
        &mut self,
        form: &OperatorForm,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) -> Result<ControllerState, ControllerError> {
        let advanced = self.recompute_after_gap(form)?;
        let (interval, notice) = form.publish_interval();

        let snapshot = self.snapshot.as_mut().ok_or(ControllerError::NoOpenTrack)?;
        let previous = snapshot.kinematics;
        snapshot.kinematics = advanced;

        effects.push(Effect::StopTimer(TimerKind::Elapsed));
        let status = form.status_override.unwrap_or(TrackStatus::Update);
        if let Err(err) = self.emit(status, now_ms, effects) {
            if let Some(snapshot) = self.snapshot.as_mut() {
                snapshot.kinematics = previous;
            }
            return Err(err);
        }
        if let Some(notice) = notice {
            warn!("{}", notice);
            effects.push(Effect::Notify(notice));
        }

        self.publish_interval = interval;
        self.elapsed_secs = 0;
        self.start_timers(effects);
        effects.push(Effect::Refresh(advanced));
        Ok(ControllerState::Running)
    }

    fn terminate<I: OperatorInput + ?Sized>(
        &mut self,
        input: &mut I,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) -> Result<ControllerState, ControllerError> {
        // the delete notice goes out before anything is reset
        self.emit(TrackStatus::Delete, now_ms, effects)?;
        effects.push(Effect::StopTimer(TimerKind::Simulation));
        effects.push(Effect::StopTimer(TimerKind::Publish));
        effects.push(Effect::StopTimer(TimerKind::Elapsed));
        self.elapsed_secs = 0;

        if let Some(snapshot) = &self.snapshot {
            info!("track {} terminated", snapshot.id);
        }

        let associate = input.form().keep_motion_trend && input.confirm_association();
        if !associate {
            self.snapshot = None;
            return Ok(ControllerState::Idle);
        }

        effects.push(Effect::LockFields(FormField::ASSOCIATION_LOCKED.to_vec()));
        effects.push(Effect::StartTimer {
            timer: TimerKind::Elapsed,
            period: TICK,
        });
        if let Some(snapshot) = &self.snapshot {
            effects.push(Effect::Refresh(snapshot.kinematics));
        }
        Ok(ControllerState::AwaitingAssociation)
    }

    fn associate(
        &mut self,
        form: &OperatorForm,
        now_ms: u64,
        effects: &mut Vec<Effect>,
    ) -> Result<ControllerState, ControllerError> {
        let carried = self.recompute_after_gap(form)?;
        let mut opened = vec![
            Effect::StopTimer(TimerKind::Elapsed),
            Effect::UnlockFields,
        ];
        let next = self.open_track(form, Some(carried), now_ms, &mut opened)?;
        effects.append(&mut opened);
        Ok(next)
    }

    fn cancel_association(&mut self, effects: &mut Vec<Effect>) -> ControllerState {
        effects.push(Effect::StopTimer(TimerKind::Elapsed));
        effects.push(Effect::UnlockFields);
        self.snapshot = None;
        self.elapsed_secs = 0;
        ControllerState::Idle
    }

    fn simulate(
        &mut self,
        form: &OperatorForm,
        effects: &mut Vec<Effect>,
    ) -> Result<ControllerState, ControllerError> {
        let snapshot = self.snapshot.as_mut().ok_or(ControllerError::NoOpenTrack)?;
        match form.number(FormField::Course) {
            Some(course) => snapshot.kinematics.course_deg = normalize_course(course),
            None => warn!(
                "course {:?} is not numeric; holding {} deg",
                form.course, snapshot.kinematics.course_deg
            ),
        }
        snapshot.kinematics = snapshot.kinematics.step(form.ramp, TICK.as_secs_f64());
        effects.push(Effect::Refresh(snapshot.kinematics));
        Ok(ControllerState::Running)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kinematics::RampProfile;
    use crate::target::class::TargetClass;
    use approx::assert_abs_diff_eq;

    struct FormInput {
        form: OperatorForm,
        confirm: bool,
    }

    impl OperatorInput for FormInput {
        fn form(&self) -> &OperatorForm {
            &self.form
        }

        fn confirm_association(&mut self) -> bool {
            self.confirm
        }
    }

    impl FormInput {
        fn new() -> Self {
            let mut form = OperatorForm::default();
            form.latitude = "30".into();
            form.longitude = "120".into();
            form.speed = "5".into();
            form.course = "0".into();
            form.length = "80".into();
            form.ais_sources = "765".into();
            form.class = TargetClass::RadarAis;
            Self {
                form,
                confirm: true,
            }
        }

        /// Applies display effects the way an operator surface would.
        fn apply(&mut self, transition: &Transition) {
            for effect in &transition.effects {
                match effect {
                    Effect::Refresh(kinematics) => self.form.show_kinematics(kinematics),
                    Effect::LockFields(fields) => self.form.lock(fields),
                    Effect::UnlockFields => self.form.unlock_all(),
                    _ => {}
                }
            }
        }
    }

    fn controller() -> MotionController {
        MotionController::new(IdentityPolicy::default(), AssemblerConfig::default())
            .unwrap()
            .with_seed(11)
    }

    fn drive(ctl: &mut MotionController, input: &mut FormInput, event: Event) -> Transition {
        let transition = ctl.handle(event, input, 1_000);
        input.apply(&transition);
        transition
    }

    fn statuses(transition: &Transition) -> Vec<Option<TrackStatus>> {
        transition.published().map(|r| r.track_status()).collect()
    }

    #[test]
    fn start_is_refused_until_required_fields_are_numeric() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        input.form.latitude = "north".into();
        input.form.length.clear();

        let transition = drive(&mut ctl, &mut input, Event::Start);
        assert_eq!(transition.state, ControllerState::Idle);
        assert_eq!(
            transition.effects[0],
            Effect::FlagInvalid(vec![FormField::Latitude, FormField::Length])
        );
        assert_eq!(transition.published().count(), 0);
        assert!(ctl.snapshot().is_none());
    }

    #[test]
    fn start_publishes_new_then_updates() {
        let mut ctl = controller();
        let mut input = FormInput::new();

        let started = drive(&mut ctl, &mut input, Event::Start);
        assert_eq!(started.state, ControllerState::Running);
        assert_eq!(statuses(&started), vec![Some(TrackStatus::New)]);
        assert!(started.effects.contains(&Effect::StartTimer {
            timer: TimerKind::Publish,
            period: Duration::from_secs(3),
        }));
        assert!(started
            .effects
            .iter()
            .any(|e| matches!(e, Effect::IdentityAssigned(g) if g.id.is_some() && g.mobile_id.is_some())));

        let id = ctl.snapshot().unwrap().id;
        for _ in 0..3 {
            drive(&mut ctl, &mut input, Event::SimulationTick);
            let tick = drive(&mut ctl, &mut input, Event::PublishTick);
            assert_eq!(statuses(&tick), vec![Some(TrackStatus::Update)]);
            assert_eq!(tick.published().next().unwrap().id, id);
            assert!(!tick
                .effects
                .iter()
                .any(|e| matches!(e, Effect::IdentityAssigned(_))));
        }
    }

    #[test]
    fn simulation_tick_moves_along_course_without_publishing() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        drive(&mut ctl, &mut input, Event::Start);

        let tick = drive(&mut ctl, &mut input, Event::SimulationTick);
        assert_eq!(tick.published().count(), 0);
        let moved = ctl.snapshot().unwrap().kinematics;
        assert!(moved.position.latitude > 30.0);
        assert_abs_diff_eq!(moved.position.longitude, 120.0, epsilon = 1e-9);
        assert_eq!(input.form.latitude, moved.position.latitude.to_string());
    }

    #[test]
    fn operator_steering_applies_on_next_tick() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        drive(&mut ctl, &mut input, Event::Start);
        input.form.course = "90".into();
        drive(&mut ctl, &mut input, Event::SimulationTick);
        let k = ctl.snapshot().unwrap().kinematics;
        assert_eq!(k.course_deg, 90.0);
        assert!(k.position.longitude > 120.0);
    }

    #[test]
    fn pause_resume_ramps_over_elapsed_time() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        input.form.ramp = RampProfile::Accelerate { rate: 0.1 };
        drive(&mut ctl, &mut input, Event::Start);

        let paused = drive(&mut ctl, &mut input, Event::PauseResume);
        assert_eq!(paused.state, ControllerState::Paused);
        assert!(paused
            .effects
            .contains(&Effect::StopTimer(TimerKind::Simulation)));
        // stale ticks from the stopped timers are ignored
        assert!(drive(&mut ctl, &mut input, Event::PublishTick)
            .effects
            .is_empty());

        for _ in 0..10 {
            drive(&mut ctl, &mut input, Event::ElapsedTick);
        }
        assert_eq!(ctl.elapsed_secs(), 10);

        let resumed = drive(&mut ctl, &mut input, Event::PauseResume);
        assert_eq!(resumed.state, ControllerState::Running);
        assert_eq!(statuses(&resumed), vec![Some(TrackStatus::Update)]);

        let k = ctl.snapshot().unwrap().kinematics;
        assert_abs_diff_eq!(k.speed_knots, 5.016_666, epsilon = 1e-5);
        let expected = crate::kinematics::GeoPosition::new(30.0, 120.0).advance(
            5.008_333_3,
            0.0,
            10.0,
        );
        assert_abs_diff_eq!(k.position.latitude, expected.latitude, epsilon = 1e-8);
        assert_eq!(ctl.elapsed_secs(), 0);
    }

    #[test]
    fn resume_with_corrupted_field_keeps_paused() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        drive(&mut ctl, &mut input, Event::Start);
        drive(&mut ctl, &mut input, Event::PauseResume);
        drive(&mut ctl, &mut input, Event::ElapsedTick);
        input.form.speed = "5 kn".into();

        let refused = drive(&mut ctl, &mut input, Event::PauseResume);
        assert_eq!(refused.state, ControllerState::Paused);
        assert_eq!(refused.published().count(), 0);
        assert!(matches!(refused.effects[0], Effect::Notify(_)));
        assert_eq!(ctl.elapsed_secs(), 1);
    }

    #[test]
    fn terminate_emits_single_delete_first() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        drive(&mut ctl, &mut input, Event::Start);

        let terminated = drive(&mut ctl, &mut input, Event::Terminate);
        assert_eq!(terminated.state, ControllerState::Idle);
        assert!(matches!(&terminated.effects[0], Effect::Publish(r) if r.track_status() == Some(TrackStatus::Delete)));
        assert_eq!(statuses(&terminated), vec![Some(TrackStatus::Delete)]);
        assert!(ctl.snapshot().is_none());

        // nothing left to delete
        assert!(drive(&mut ctl, &mut input, Event::Terminate)
            .effects
            .is_empty());
    }

    #[test]
    fn terminate_from_pause_also_deletes() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        drive(&mut ctl, &mut input, Event::Start);
        drive(&mut ctl, &mut input, Event::PauseResume);
        let terminated = drive(&mut ctl, &mut input, Event::Terminate);
        assert_eq!(statuses(&terminated), vec![Some(TrackStatus::Delete)]);
        assert!(terminated
            .effects
            .contains(&Effect::StopTimer(TimerKind::Elapsed)));
    }

    #[test]
    fn association_carries_kinematics_into_next_track() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        input.form.keep_motion_trend = true;
        input.form.ramp = RampProfile::Decelerate { rate: 60.0 };
        drive(&mut ctl, &mut input, Event::Start);
        let first_id = ctl.snapshot().unwrap().id;

        let waiting = drive(&mut ctl, &mut input, Event::Terminate);
        assert_eq!(waiting.state, ControllerState::AwaitingAssociation);
        assert_eq!(statuses(&waiting), vec![Some(TrackStatus::Delete)]);
        assert!(input.form.is_locked(FormField::Speed));
        assert!(input.form.set_text(FormField::Latitude, "0").is_err());
        input.form.set_text(FormField::Course, "180").unwrap();

        for _ in 0..2 {
            drive(&mut ctl, &mut input, Event::ElapsedTick);
        }
        let next = drive(&mut ctl, &mut input, Event::Start);
        assert_eq!(next.state, ControllerState::Running);
        assert_eq!(statuses(&next), vec![Some(TrackStatus::New)]);
        assert!(!input.form.is_locked(FormField::Speed));

        let snapshot = ctl.snapshot().unwrap();
        assert_ne!(snapshot.id, first_id);
        // 60 kn/min for 2 s takes 2 kn off
        assert_abs_diff_eq!(snapshot.kinematics.speed_knots, 3.0, epsilon = 1e-9);
        assert_eq!(snapshot.kinematics.course_deg, 180.0);
        assert!(snapshot.kinematics.position.latitude < 30.0);
    }

    #[test]
    fn declined_association_returns_to_idle() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        input.form.keep_motion_trend = true;
        input.confirm = false;
        drive(&mut ctl, &mut input, Event::Start);
        let terminated = drive(&mut ctl, &mut input, Event::Terminate);
        assert_eq!(terminated.state, ControllerState::Idle);
        assert!(input.form.locked_fields().is_empty());
    }

    #[test]
    fn cancelling_association_unlocks_without_publishing() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        input.form.keep_motion_trend = true;
        drive(&mut ctl, &mut input, Event::Start);
        drive(&mut ctl, &mut input, Event::Terminate);

        let cancelled = drive(&mut ctl, &mut input, Event::Terminate);
        assert_eq!(cancelled.state, ControllerState::Idle);
        assert_eq!(cancelled.published().count(), 0);
        assert!(input.form.locked_fields().is_empty());
    }

    #[test]
    fn status_override_replaces_update() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        input.form.status_override = Some(TrackStatus::New);
        drive(&mut ctl, &mut input, Event::Start);
        let tick = drive(&mut ctl, &mut input, Event::PublishTick);
        assert_eq!(statuses(&tick), vec![Some(TrackStatus::New)]);
        let terminated = drive(&mut ctl, &mut input, Event::Terminate);
        assert_eq!(statuses(&terminated), vec![Some(TrackStatus::Delete)]);
    }

    #[test]
    fn invalid_interval_falls_back_with_notice() {
        let mut ctl = controller();
        let mut input = FormInput::new();
        input.form.publish_interval = "0".into();
        let started = drive(&mut ctl, &mut input, Event::Start);
        assert_eq!(started.state, ControllerState::Running);
        assert_eq!(ctl.publish_interval(), DEFAULT_PUBLISH_INTERVAL);
        assert!(started.effects.iter().any(|e| matches!(e, Effect::Notify(_))));
    }

    #[test]
    fn bad_identity_policy_is_rejected_up_front() {
        let policy = IdentityPolicy {
            id: crate::target::identity::IdTemplate::new("11", 2),
            ..IdentityPolicy::default()
        };
        assert!(MotionController::new(policy, AssemblerConfig::default()).is_err());
    }
}
