use crate::workflow::command::Command;
use anyhow::{bail, Context};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{sleep_until, Instant};
use trackcore::OperatorForm;

/// One operator command, issued `at_secs` after the scenario starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioStep {
    pub at_secs: f64,
    #[serde(flatten)]
    pub command: Command,
}

/// Scripted operator session: an initial form and timed commands.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioProfile {
    pub name: Option<String>,
    pub description: Option<String>,
    pub form: OperatorForm,
    pub steps: Vec<ScenarioStep>,
    /// Shut the runner down this long after the start. Runs until
    /// interrupted when absent.
    pub duration_secs: Option<f64>,
}

fn offset(secs: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(secs).ok()
}

impl ScenarioProfile {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading scenario {}", path_ref.display()))?;
        let mut profile: ScenarioProfile = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing scenario {}", path_ref.display()))?;
        profile
            .normalize()
            .with_context(|| format!("checking scenario {}", path_ref.display()))?;
        Ok(profile)
    }

    /// Orders steps by time and rejects offsets that are not usable.
    pub fn normalize(&mut self) -> anyhow::Result<()> {
        for step in &self.steps {
            if offset(step.at_secs).is_none() {
                bail!("step {:?} has invalid time {}", step.command, step.at_secs);
            }
        }
        if let Some(duration) = self.duration_secs {
            if offset(duration).is_none() {
                bail!("invalid duration {}", duration);
            }
        }
        self.steps
            .sort_by(|a, b| a.at_secs.total_cmp(&b.at_secs));
        Ok(())
    }

    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("unnamed scenario")
    }

    /// Sends each step at its offset, then `Shutdown` once the duration
    /// has passed.
    pub async fn feed(self, commands: UnboundedSender<Command>) {
        let start = Instant::now();
        info!("scenario {} started with {} steps", self.label(), self.steps.len());
        for step in self.steps {
            sleep_until(start + offset(step.at_secs).unwrap_or_default()).await;
            if commands.send(step.command).is_err() {
                warn!("runner went away; scenario stopped early");
                return;
            }
        }
        if let Some(duration) = self.duration_secs.and_then(offset) {
            sleep_until(start + duration).await;
            let _ = commands.send(Command::Shutdown);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;
    use tokio::sync::mpsc::unbounded_channel;
    use trackcore::controller::FormField;
    use trackcore::kinematics::RampProfile;

    const SCENARIO: &str = r#"
name: harbour exit
form:
  latitude: "38.41174312"
  longitude: "118.2365294"
  speed: "0.1"
  course: "113"
  length: "178"
  ramp:
    mode: accelerate
    rate: 6.0
steps:
  - at_secs: 30
    command: terminate
    confirm: false
  - at_secs: 0
    command: start
  - at_secs: 12.5
    command: set_field
    field: course
    value: "90"
duration_secs: 40
"#;

    #[test]
    fn scenario_loads_and_orders_steps() {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(SCENARIO.as_bytes()).unwrap();
        let path = temp.into_temp_path();
        let profile = ScenarioProfile::load(&path).unwrap();

        assert_eq!(profile.label(), "harbour exit");
        assert_eq!(profile.form.ramp, RampProfile::Accelerate { rate: 6.0 });
        let times: Vec<f64> = profile.steps.iter().map(|s| s.at_secs).collect();
        assert_eq!(times, vec![0.0, 12.5, 30.0]);
        assert_eq!(profile.steps[0].command, Command::Start);
        assert_eq!(
            profile.steps[1].command,
            Command::SetField {
                field: FormField::Course,
                value: "90".into()
            }
        );
        assert_eq!(
            profile.steps[2].command,
            Command::Terminate { confirm: false }
        );
    }

    #[test]
    fn bundled_demo_scenario_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../demos/harbour_exit.yaml");
        let profile = ScenarioProfile::load(path).unwrap();
        assert!(profile.form.keep_motion_trend);
        assert_eq!(profile.steps.len(), 7);
        assert!(profile.form.seed_snapshot().is_ok());
    }

    #[test]
    fn negative_offsets_are_rejected() {
        let mut profile = ScenarioProfile {
            steps: vec![ScenarioStep {
                at_secs: -1.0,
                command: Command::Start,
            }],
            ..ScenarioProfile::default()
        };
        assert!(profile.normalize().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn feed_releases_steps_on_schedule() {
        let mut profile: ScenarioProfile = serde_yaml::from_str(SCENARIO).unwrap();
        profile.normalize().unwrap();
        let (tx, mut rx) = unbounded_channel();
        let started = Instant::now();
        tokio::spawn(profile.feed(tx));

        let mut received = Vec::new();
        while let Some(command) = rx.recv().await {
            received.push((started.elapsed().as_secs_f64(), command));
        }
        assert_eq!(received.len(), 4);
        assert_eq!(received[1].0, 12.5);
        assert_eq!(received[3], (40.0, Command::Shutdown));
    }
}
