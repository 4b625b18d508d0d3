use crate::kinematics::projector::normalize_course;
use crate::kinematics::{average_speed, next_speed, GeoPosition, RampProfile};
use crate::target::class::{SourceChannel, TargetClass, TrackStatus};
use serde::{Deserialize, Serialize};

/// Position, speed and course of the simulated vessel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub position: GeoPosition,
    pub speed_knots: f64,
    pub course_deg: f64,
}

impl Default for Kinematics {
    fn default() -> Self {
        Self {
            position: GeoPosition::new(0.0, 0.0),
            speed_knots: 0.0,
            course_deg: 0.0,
        }
    }
}

impl Kinematics {
    pub fn new(position: GeoPosition, speed_knots: f64, course_deg: f64) -> Self {
        Self {
            position,
            speed_knots: speed_knots.max(0.0),
            course_deg: normalize_course(course_deg),
        }
    }

    /// Short simulation step: the ramped speed is applied directly.
    pub fn step(&self, ramp: RampProfile, dt_secs: f64) -> Self {
        let speed = next_speed(self.speed_knots, ramp, dt_secs);
        Self {
            position: self.position.advance(speed, self.course_deg, dt_secs),
            speed_knots: speed,
            course_deg: self.course_deg,
        }
    }

    /// Long gap (pause, association wait): displacement uses the mean of the
    /// start and end speed of the linear ramp.
    pub fn after_gap(&self, ramp: RampProfile, elapsed_secs: f64) -> Self {
        let end_speed = next_speed(self.speed_knots, ramp, elapsed_secs);
        let effective = average_speed(self.speed_knots, end_speed);
        Self {
            position: self.position.advance(effective, self.course_deg, elapsed_secs),
            speed_knots: end_speed,
            course_deg: self.course_deg,
        }
    }
}

/// Identifier lists typed per source channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceIds {
    pub radar: Vec<String>,
    pub ais: Vec<String>,
    pub satellite: Vec<String>,
}

impl SourceIds {
    pub fn parse(radar: &str, ais: &str, satellite: &str) -> Self {
        Self {
            radar: split_ids(radar),
            ais: split_ids(ais),
            satellite: split_ids(satellite),
        }
    }

    pub fn for_channel(&self, channel: SourceChannel) -> &[String] {
        match channel {
            SourceChannel::Radar => &self.radar,
            SourceChannel::Ais => &self.ais,
            SourceChannel::Satellite => &self.satellite,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (SourceChannel, &[String])> + '_ {
        SourceChannel::ALL
            .into_iter()
            .map(move |channel| (channel, self.for_channel(channel)))
            .filter(|(_, ids)| !ids.is_empty())
    }
}

/// Splits a comma separated identifier list, accepting full-width commas too.
pub fn split_ids(text: &str) -> Vec<String> {
    text.split([',', '，'])
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

/// Mutable state of the one target currently being simulated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    pub id: u64,
    pub mobile_id: u64,
    pub satellite_id: String,
    /// Name reported over AIS.
    pub vessel_name: String,
    /// Name reported by the satellite terminal.
    pub satellite_name: String,
    pub kinematics: Kinematics,
    pub length: u32,
    pub max_length: u32,
    pub ship_type: u32,
    pub adapter: u32,
    pub target_state: u32,
    pub class: TargetClass,
    pub status: TrackStatus,
    pub sources: SourceIds,
}

impl TargetSnapshot {
    /// Name published for this target, chosen by the channels its class uses.
    pub fn reported_name(&self) -> &str {
        if self.class.includes(SourceChannel::Ais) {
            &self.vessel_name
        } else if self.class.includes(SourceChannel::Satellite) {
            &self.satellite_name
        } else {
            ""
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn split_ids_trims_and_drops_blanks() {
        assert_eq!(split_ids(" 771, 761 ,,"), vec!["771", "761"]);
        assert_eq!(split_ids("765，771"), vec!["765", "771"]);
        assert!(split_ids("  ").is_empty());
    }

    #[test]
    fn source_iteration_skips_empty_channels() {
        let sources = SourceIds::parse("1,2", "", "B7");
        let channels: Vec<_> = sources.iter().map(|(c, ids)| (c, ids.len())).collect();
        assert_eq!(
            channels,
            vec![(SourceChannel::Radar, 2), (SourceChannel::Satellite, 1)]
        );
    }

    #[test]
    fn gap_uses_average_speed_for_displacement() {
        let start = Kinematics::new(GeoPosition::new(30.0, 120.0), 5.0, 0.0);
        let ramp = RampProfile::Accelerate { rate: 0.1 };
        let after = start.after_gap(ramp, 10.0);

        assert_abs_diff_eq!(after.speed_knots, 5.016_666, epsilon = 1e-5);
        let expected = start.position.advance(5.008_333_3, 0.0, 10.0);
        assert_abs_diff_eq!(after.position.latitude, expected.latitude, epsilon = 1e-9);
    }

    #[test]
    fn kinematics_normalizes_course_and_speed() {
        let k = Kinematics::new(GeoPosition::new(0.0, 0.0), -3.0, 370.0);
        assert_eq!(k.speed_knots, 0.0);
        assert_abs_diff_eq!(k.course_deg, 10.0, epsilon = 1e-9);
    }

    #[test]
    fn reported_name_follows_class() {
        let mut snapshot = TargetSnapshot {
            vessel_name: "CHANG FENG 98".into(),
            satellite_name: "LU RONG YU".into(),
            class: TargetClass::SatelliteOnly,
            ..TargetSnapshot::default()
        };
        assert_eq!(snapshot.reported_name(), "LU RONG YU");
        snapshot.class = TargetClass::RadarAis;
        assert_eq!(snapshot.reported_name(), "CHANG FENG 98");
        snapshot.class = TargetClass::RadarOnly;
        assert_eq!(snapshot.reported_name(), "");
    }
}
