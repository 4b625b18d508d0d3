use serde::{Deserialize, Serialize};

/// Sensor channel a track can be reported through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceChannel {
    Radar,
    Ais,
    Satellite,
}

impl SourceChannel {
    pub const ALL: [SourceChannel; 3] = [Self::Radar, Self::Ais, Self::Satellite];

    /// Channel label carried in the `type` field of a source block.
    pub fn wire_type(&self) -> &'static str {
        match self {
            Self::Radar => "RADAR",
            Self::Ais => "AIS",
            Self::Satellite => "BEIDOU",
        }
    }
}

/// Combination of source types that make up a simulated target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetClass {
    RadarOnly,
    AisOnly,
    #[default]
    RadarAis,
    SatelliteOnly,
    RadarSatellite,
    AisSatellite,
    RadarAisSatellite,
}

impl TargetClass {
    pub fn code(&self) -> u32 {
        match self {
            Self::RadarOnly => 1,
            Self::AisOnly => 2,
            Self::RadarAis => 3,
            Self::SatelliteOnly => 4,
            Self::RadarSatellite => 5,
            Self::AisSatellite => 6,
            Self::RadarAisSatellite => 7,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(Self::RadarOnly),
            2 => Some(Self::AisOnly),
            3 => Some(Self::RadarAis),
            4 => Some(Self::SatelliteOnly),
            5 => Some(Self::RadarSatellite),
            6 => Some(Self::AisSatellite),
            7 => Some(Self::RadarAisSatellite),
            _ => None,
        }
    }

    pub fn includes(&self, channel: SourceChannel) -> bool {
        let code = self.code();
        let bit = match channel {
            SourceChannel::Radar => 1,
            SourceChannel::Ais => 2,
            SourceChannel::Satellite => 4,
        };
        code & bit != 0
    }

    pub fn is_radar_only(&self) -> bool {
        *self == Self::RadarOnly
    }

    pub fn is_satellite_only(&self) -> bool {
        *self == Self::SatelliteOnly
    }

    pub fn requires_id(&self) -> bool {
        !self.is_satellite_only()
    }

    pub fn requires_mobile_id(&self) -> bool {
        self.includes(SourceChannel::Ais)
    }

    pub fn requires_satellite_id(&self) -> bool {
        self.includes(SourceChannel::Satellite)
    }
}

/// Lifecycle tag carried by every published record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrackStatus {
    #[default]
    New,
    Update,
    Delete,
}

impl TrackStatus {
    pub fn code(&self) -> i32 {
        match self {
            Self::New => 0,
            Self::Update => 1,
            Self::Delete => 2,
        }
    }

    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::New),
            1 => Some(Self::Update),
            2 => Some(Self::Delete),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_identifier_requirements() {
        assert!(TargetClass::RadarOnly.requires_id());
        assert!(!TargetClass::RadarOnly.requires_mobile_id());
        assert!(TargetClass::RadarAis.requires_mobile_id());
        assert!(!TargetClass::SatelliteOnly.requires_id());
        assert!(TargetClass::SatelliteOnly.requires_satellite_id());
        assert!(TargetClass::RadarAisSatellite.includes(SourceChannel::Radar));
    }

    #[test]
    fn class_codes_are_stable() {
        for code in 1..=7 {
            assert_eq!(TargetClass::from_code(code).unwrap().code(), code);
        }
        assert!(TargetClass::from_code(0).is_none());
    }
}
