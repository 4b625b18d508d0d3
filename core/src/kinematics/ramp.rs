use serde::{Deserialize, Serialize};

/// Rule for how speed evolves while a target is simulated.
///
/// Rates are expressed in knots per minute, matching what operators type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RampProfile {
    #[default]
    Constant,
    Decelerate { rate: f64 },
    Accelerate { rate: f64 },
}

impl RampProfile {
    fn rate_per_second(rate_per_minute: f64) -> f64 {
        rate_per_minute.abs() / 60.0
    }

    /// Speed after `elapsed_secs` under this profile.
    pub fn next_speed(&self, current_knots: f64, elapsed_secs: f64) -> f64 {
        next_speed(current_knots, *self, elapsed_secs)
    }
}

/// New speed after `elapsed_secs` of ramping. Never negative.
pub fn next_speed(current_knots: f64, profile: RampProfile, elapsed_secs: f64) -> f64 {
    let elapsed = elapsed_secs.max(0.0);
    let speed = match profile {
        RampProfile::Constant => current_knots,
        RampProfile::Decelerate { rate } => {
            current_knots - RampProfile::rate_per_second(rate) * elapsed
        }
        RampProfile::Accelerate { rate } => {
            current_knots + RampProfile::rate_per_second(rate) * elapsed
        }
    };
    speed.max(0.0)
}

/// Effective speed for displacement over a linear ramp between two speeds.
pub fn average_speed(start_knots: f64, end_knots: f64) -> f64 {
    (start_knots + end_knots) / 2.0
}
