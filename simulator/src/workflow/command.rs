use serde::{Deserialize, Serialize};
use trackcore::controller::{CompassPoint, FormField};
use trackcore::kinematics::RampProfile;
use trackcore::prelude::OperatorInput;
use trackcore::target::{TargetClass, TrackStatus};
use trackcore::OperatorForm;

fn default_confirm() -> bool {
    true
}

/// Selector values the operator can change without typing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FormOptions {
    pub class: Option<TargetClass>,
    pub ship_type: Option<u32>,
    pub target_state: Option<u32>,
    pub adapter: Option<u32>,
    pub ramp: Option<RampProfile>,
    pub keep_motion_trend: Option<bool>,
    pub status_override: Option<TrackStatus>,
    pub clear_status_override: bool,
}

/// Operator actions delivered to the runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Start,
    PauseResume,
    Terminate {
        /// Answer to the association prompt.
        #[serde(default = "default_confirm")]
        confirm: bool,
    },
    SetField {
        field: FormField,
        value: String,
    },
    SetCourse {
        point: CompassPoint,
    },
    SetOptions(FormOptions),
    LoadForm {
        form: OperatorForm,
    },
    QuickFill {
        text: String,
    },
    Clear,
    Shutdown,
}

/// The runner's operator surface: the form plus the answer to the next
/// association prompt and the fields currently flagged invalid.
#[derive(Debug, Clone, Default)]
pub struct OperatorDesk {
    pub form: OperatorForm,
    pub confirm: bool,
    pub invalid: Vec<FormField>,
}

impl OperatorDesk {
    pub fn new(form: OperatorForm, confirm: bool) -> Self {
        Self {
            form,
            confirm,
            invalid: Vec::new(),
        }
    }

    pub fn apply_options(&mut self, options: FormOptions) {
        let form = &mut self.form;
        if let Some(class) = options.class {
            form.class = class;
        }
        if let Some(ship_type) = options.ship_type {
            form.ship_type = ship_type;
        }
        if let Some(target_state) = options.target_state {
            form.target_state = target_state;
        }
        if let Some(adapter) = options.adapter {
            form.adapter = adapter;
        }
        if let Some(ramp) = options.ramp {
            form.ramp = ramp;
        }
        if let Some(keep) = options.keep_motion_trend {
            form.keep_motion_trend = keep;
        }
        if options.clear_status_override {
            form.status_override = None;
        } else if options.status_override.is_some() {
            form.status_override = options.status_override;
        }
    }
}

impl OperatorInput for OperatorDesk {
    fn form(&self) -> &OperatorForm {
        &self.form
    }

    fn confirm_association(&mut self) -> bool {
        self.confirm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_parse_from_json() {
        let start: Command = serde_json::from_str(r#"{"command":"start"}"#).unwrap();
        assert_eq!(start, Command::Start);
        let terminate: Command = serde_json::from_str(r#"{"command":"terminate"}"#).unwrap();
        assert_eq!(terminate, Command::Terminate { confirm: true });
        let set: Command =
            serde_json::from_str(r#"{"command":"set_field","field":"speed","value":"7"}"#).unwrap();
        assert_eq!(
            set,
            Command::SetField {
                field: FormField::Speed,
                value: "7".into()
            }
        );
        let options: Command = serde_json::from_str(
            r#"{"command":"set_options","ramp":{"mode":"decelerate","rate":2.0},"keep_motion_trend":true}"#,
        )
        .unwrap();
        assert!(matches!(options, Command::SetOptions(FormOptions { keep_motion_trend: Some(true), .. })));
    }

    #[test]
    fn options_only_touch_given_selectors() {
        let mut desk = OperatorDesk::new(OperatorForm::default(), true);
        desk.form.status_override = Some(TrackStatus::New);
        desk.apply_options(FormOptions {
            class: Some(TargetClass::AisOnly),
            clear_status_override: true,
            ..FormOptions::default()
        });
        assert_eq!(desk.form.class, TargetClass::AisOnly);
        assert_eq!(desk.form.status_override, None);
        assert_eq!(desk.form.ship_type, 99);
    }
}
