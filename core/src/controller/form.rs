use crate::kinematics::{GeoPosition, RampProfile};
use crate::prelude::{ControllerError, FormError, ValidationError};
use crate::target::class::{TargetClass, TrackStatus};
use crate::target::snapshot::{Kinematics, SourceIds, TargetSnapshot};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_PUBLISH_INTERVAL: Duration = Duration::from_millis(3000);

/// Text fields of the operator form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Id,
    MobileId,
    SatelliteId,
    VesselName,
    SatelliteName,
    Longitude,
    Latitude,
    Speed,
    Course,
    Length,
    MaxLength,
    RadarSources,
    AisSources,
    SatelliteSources,
    PublishInterval,
}

impl FormField {
    pub const REQUIRED: [FormField; 5] = [
        Self::Longitude,
        Self::Latitude,
        Self::Speed,
        Self::Course,
        Self::Length,
    ];

    /// Fields frozen while a terminated track waits to be associated.
    pub const ASSOCIATION_LOCKED: [FormField; 3] = [Self::Latitude, Self::Longitude, Self::Speed];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Id => "ID",
            Self::MobileId => "MMSI",
            Self::SatelliteId => "Satellite ID",
            Self::VesselName => "Vessel name",
            Self::SatelliteName => "Satellite vessel name",
            Self::Longitude => "Longitude",
            Self::Latitude => "Latitude",
            Self::Speed => "Speed",
            Self::Course => "Course",
            Self::Length => "Length",
            Self::MaxLength => "Max length",
            Self::RadarSources => "Radar sources",
            Self::AisSources => "AIS sources",
            Self::SatelliteSources => "Satellite sources",
            Self::PublishInterval => "Publish interval",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            Self::Id
                | Self::MobileId
                | Self::Longitude
                | Self::Latitude
                | Self::Speed
                | Self::Course
                | Self::Length
                | Self::MaxLength
                | Self::PublishInterval
        )
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Eight-point course shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompassPoint {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl CompassPoint {
    pub fn degrees(&self) -> u32 {
        match self {
            Self::North => 0,
            Self::NorthEast => 45,
            Self::East => 90,
            Self::SouthEast => 135,
            Self::South => 180,
            Self::SouthWest => 225,
            Self::West => 270,
            Self::NorthWest => 315,
        }
    }
}

/// Everything the operator can type or select. Text fields hold raw input;
/// parsing happens when the controller needs the values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OperatorForm {
    pub id: String,
    pub mobile_id: String,
    pub satellite_id: String,
    pub vessel_name: String,
    pub satellite_name: String,
    pub longitude: String,
    pub latitude: String,
    pub speed: String,
    pub course: String,
    pub length: String,
    pub max_length: String,
    pub radar_sources: String,
    pub ais_sources: String,
    pub satellite_sources: String,
    /// Seconds between periodic publishes.
    pub publish_interval: String,
    pub class: TargetClass,
    pub ship_type: u32,
    pub target_state: u32,
    pub adapter: u32,
    pub status_override: Option<TrackStatus>,
    pub ramp: RampProfile,
    pub keep_motion_trend: bool,
    #[serde(skip)]
    locked: BTreeSet<FormField>,
}

impl Default for OperatorForm {
    fn default() -> Self {
        Self {
            id: String::new(),
            mobile_id: String::new(),
            satellite_id: String::new(),
            vessel_name: String::new(),
            satellite_name: String::new(),
            longitude: String::new(),
            latitude: String::new(),
            speed: String::new(),
            course: String::new(),
            length: String::new(),
            max_length: String::new(),
            radar_sources: String::new(),
            ais_sources: String::new(),
            satellite_sources: String::new(),
            publish_interval: "3".to_string(),
            class: TargetClass::default(),
            ship_type: 99,
            target_state: 1,
            adapter: 0,
            status_override: None,
            ramp: RampProfile::Constant,
            keep_motion_trend: false,
            locked: BTreeSet::new(),
        }
    }
}

impl OperatorForm {
    /// Blank form whose publish interval field starts at `seconds`.
    pub fn with_publish_interval(seconds: impl Into<String>) -> Self {
        Self {
            publish_interval: seconds.into(),
            ..Self::default()
        }
    }

    pub fn text(&self, field: FormField) -> &str {
        match field {
            FormField::Id => &self.id,
            FormField::MobileId => &self.mobile_id,
            FormField::SatelliteId => &self.satellite_id,
            FormField::VesselName => &self.vessel_name,
            FormField::SatelliteName => &self.satellite_name,
            FormField::Longitude => &self.longitude,
            FormField::Latitude => &self.latitude,
            FormField::Speed => &self.speed,
            FormField::Course => &self.course,
            FormField::Length => &self.length,
            FormField::MaxLength => &self.max_length,
            FormField::RadarSources => &self.radar_sources,
            FormField::AisSources => &self.ais_sources,
            FormField::SatelliteSources => &self.satellite_sources,
            FormField::PublishInterval => &self.publish_interval,
        }
    }

    fn slot(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Id => &mut self.id,
            FormField::MobileId => &mut self.mobile_id,
            FormField::SatelliteId => &mut self.satellite_id,
            FormField::VesselName => &mut self.vessel_name,
            FormField::SatelliteName => &mut self.satellite_name,
            FormField::Longitude => &mut self.longitude,
            FormField::Latitude => &mut self.latitude,
            FormField::Speed => &mut self.speed,
            FormField::Course => &mut self.course,
            FormField::Length => &mut self.length,
            FormField::MaxLength => &mut self.max_length,
            FormField::RadarSources => &mut self.radar_sources,
            FormField::AisSources => &mut self.ais_sources,
            FormField::SatelliteSources => &mut self.satellite_sources,
            FormField::PublishInterval => &mut self.publish_interval,
        }
    }

    /// Operator edit. Rejected while the field is locked.
    pub fn set_text(&mut self, field: FormField, value: impl Into<String>) -> Result<(), FormError> {
        if self.locked.contains(&field) {
            return Err(FormError::Locked(field));
        }
        *self.slot(field) = value.into();
        Ok(())
    }

    pub fn set_course(&mut self, point: CompassPoint) -> Result<(), FormError> {
        self.set_text(FormField::Course, point.degrees().to_string())
    }

    pub fn lock(&mut self, fields: &[FormField]) {
        self.locked.extend(fields.iter().copied());
    }

    pub fn unlock_all(&mut self) {
        self.locked.clear();
    }

    pub fn is_locked(&self, field: FormField) -> bool {
        self.locked.contains(&field)
    }

    pub fn locked_fields(&self) -> Vec<FormField> {
        self.locked.iter().copied().collect()
    }

    /// Clears every field back to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Mirrors simulated kinematics into the visible fields.
    ///
    /// Values are written with full precision so reading them back yields the
    /// same numbers. Locks do not apply: this is the display being refreshed.
    pub fn show_kinematics(&mut self, kinematics: &Kinematics) {
        self.latitude = kinematics.position.latitude.to_string();
        self.longitude = kinematics.position.longitude.to_string();
        self.speed = kinematics.speed_knots.to_string();
        self.course = kinematics.course_deg.to_string();
    }

    pub fn number(&self, field: FormField) -> Option<f64> {
        self.text(field)
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
    }

    fn field_issue(&self, field: FormField) -> bool {
        match self.number(field) {
            None => true,
            Some(value) => match field {
                FormField::Latitude => !(-90.0..=90.0).contains(&value),
                FormField::Longitude => !(-180.0..=360.0).contains(&value),
                FormField::Speed | FormField::Length => value < 0.0,
                _ => false,
            },
        }
    }

    /// Checks the fields that must be present before a track can start.
    pub fn validate_required(&self) -> Result<(), ValidationError> {
        let fields: Vec<FormField> = FormField::REQUIRED
            .iter()
            .copied()
            .filter(|field| self.field_issue(*field))
            .collect();
        if fields.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { fields })
        }
    }

    /// Current position, speed and course as the operator sees them.
    pub fn read_kinematics(&self) -> Result<Kinematics, ControllerError> {
        let mut missing = Vec::new();
        let mut read = |field: FormField| {
            if self.field_issue(field) {
                missing.push(field.label());
                0.0
            } else {
                self.number(field).unwrap_or_default()
            }
        };
        let latitude = read(FormField::Latitude);
        let longitude = read(FormField::Longitude);
        let speed = read(FormField::Speed);
        let course = read(FormField::Course);

        if !missing.is_empty() {
            return Err(ControllerError::Compute(format!(
                "non-numeric {}",
                missing.join(", ")
            )));
        }
        Ok(Kinematics::new(
            GeoPosition::new(latitude, longitude),
            speed,
            course,
        ))
    }

    /// Publish period, falling back to the default for unusable input.
    pub fn publish_interval(&self) -> (Duration, Option<String>) {
        let parsed = self
            .number(FormField::PublishInterval)
            .filter(|secs| *secs > 0.0)
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .filter(|interval| !interval.is_zero());
        match parsed {
            Some(interval) => (interval, None),
            None => (
                DEFAULT_PUBLISH_INTERVAL,
                Some(format!(
                    "publish interval {:?} must be a number greater than 0; using {} s",
                    self.publish_interval,
                    DEFAULT_PUBLISH_INTERVAL.as_secs()
                )),
            ),
        }
    }

    fn optional_integer(&self, field: FormField) -> u64 {
        let text = self.text(field).trim();
        if text.is_empty() {
            return 0;
        }
        match text.parse::<u64>() {
            Ok(value) => value,
            Err(_) => match text.parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 => value.round() as u64,
                _ => {
                    warn!("field {} value {:?} is invalid; using 0", field, text);
                    0
                }
            },
        }
    }

    fn optional_u32(&self, field: FormField) -> u32 {
        let value = self.optional_integer(field);
        u32::try_from(value).unwrap_or_else(|_| {
            warn!("field {} value {} is out of range; using 0", field, value);
            0
        })
    }

    /// Opens a snapshot from the current form contents.
    pub fn seed_snapshot(&self) -> Result<TargetSnapshot, ValidationError> {
        self.validate_required()?;
        let kinematics = Kinematics::new(
            GeoPosition::new(
                self.number(FormField::Latitude).unwrap_or_default(),
                self.number(FormField::Longitude).unwrap_or_default(),
            ),
            self.number(FormField::Speed).unwrap_or_default(),
            self.number(FormField::Course).unwrap_or_default(),
        );

        Ok(TargetSnapshot {
            id: self.optional_integer(FormField::Id),
            mobile_id: self.optional_integer(FormField::MobileId),
            satellite_id: self.satellite_id.trim().to_string(),
            vessel_name: self.vessel_name.trim().to_string(),
            satellite_name: self.satellite_name.trim().to_string(),
            kinematics,
            length: self.optional_u32(FormField::Length),
            max_length: self.optional_u32(FormField::MaxLength),
            ship_type: self.ship_type,
            adapter: self.adapter,
            target_state: self.target_state,
            class: self.class,
            status: TrackStatus::New,
            sources: SourceIds::parse(
                &self.radar_sources,
                &self.ais_sources,
                &self.satellite_sources,
            ),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled() -> OperatorForm {
        OperatorForm {
            latitude: "38.41174312".into(),
            longitude: "118.2365294".into(),
            speed: "12".into(),
            course: "113".into(),
            length: "178".into(),
            ..OperatorForm::default()
        }
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let form = OperatorForm {
            speed: "fast".into(),
            ..filled()
        };
        let mut empty = filled();
        empty.length.clear();

        assert_eq!(
            form.validate_required().unwrap_err().fields,
            vec![FormField::Speed]
        );
        assert_eq!(
            empty.seed_snapshot().unwrap_err().fields,
            vec![FormField::Length]
        );
        assert_eq!(
            OperatorForm::default().validate_required().unwrap_err().fields,
            FormField::REQUIRED.to_vec()
        );
    }

    #[test]
    fn seed_snapshot_parses_optional_fields_leniently() {
        let form = OperatorForm {
            id: "abc".into(),
            mobile_id: "413334000".into(),
            length: "178.4".into(),
            radar_sources: "771, 761".into(),
            ..filled()
        };
        let snapshot = form.seed_snapshot().unwrap();
        assert_eq!(snapshot.id, 0);
        assert_eq!(snapshot.mobile_id, 413_334_000);
        assert_eq!(snapshot.length, 178);
        assert_eq!(snapshot.sources.radar, vec!["771", "761"]);
        assert_eq!(snapshot.status, TrackStatus::New);
    }

    #[test]
    fn locked_fields_reject_edits_but_accept_refresh() {
        let mut form = filled();
        form.lock(&FormField::ASSOCIATION_LOCKED);
        assert_eq!(
            form.set_text(FormField::Speed, "3"),
            Err(FormError::Locked(FormField::Speed))
        );
        assert!(form.set_course(CompassPoint::SouthWest).is_ok());
        assert_eq!(form.course, "225");

        let kinematics = form.read_kinematics().unwrap();
        form.show_kinematics(&kinematics);
        assert_eq!(form.read_kinematics().unwrap(), kinematics);

        form.unlock_all();
        assert!(form.set_text(FormField::Speed, "3").is_ok());
    }

    #[test]
    fn invalid_publish_interval_falls_back() {
        let mut form = filled();
        form.publish_interval = "1.5".into();
        assert_eq!(form.publish_interval(), (Duration::from_millis(1500), None));

        for text in ["0", "-2", "soon", "", "0.0000000001", "1e-12"] {
            form.publish_interval = text.into();
            let (interval, notice) = form.publish_interval();
            assert_eq!(interval, DEFAULT_PUBLISH_INTERVAL);
            assert!(notice.is_some());
        }
    }

    #[test]
    fn oversized_lengths_fall_back_to_zero() {
        let mut form = filled();
        form.length = "5000000000".into();
        form.max_length = "4294967295".into();
        let snapshot = form.seed_snapshot().unwrap();
        assert_eq!(snapshot.length, 0);
        assert_eq!(snapshot.max_length, u32::MAX);
    }

    #[test]
    fn interval_constructor_starts_unlocked() {
        let form = OperatorForm::with_publish_interval("1.5");
        assert_eq!(form.publish_interval(), (Duration::from_millis(1500), None));
        assert!(form.locked_fields().is_empty());
        assert_eq!(form.ship_type, OperatorForm::default().ship_type);
    }

    #[test]
    fn read_kinematics_reports_bad_fields() {
        let mut form = filled();
        form.course = "north-ish".into();
        match form.read_kinematics() {
            Err(ControllerError::Compute(reason)) => assert!(reason.contains("Course")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
