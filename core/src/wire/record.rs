use crate::target::class::{TargetClass, TrackStatus};
use prost::Message;
use serde::{Deserialize, Serialize};

/// Envelope sent on the bus; one or more records per message.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct WireBatch {
    #[prost(message, repeated, tag = "1")]
    pub records: Vec<WireRecord>,
}

/// One fused track report.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct WireRecord {
    #[prost(uint64, tag = "1")]
    pub id: u64,
    #[prost(message, optional, tag = "2")]
    pub pos: Option<PositionBlock>,
    /// New = 0, Update = 1, Delete = 2.
    #[prost(int32, tag = "3")]
    pub status: i32,
    #[prost(uint64, tag = "4")]
    pub timestamp_ms: u64,
    #[prost(uint32, tag = "5")]
    pub adapter: u32,
    #[prost(uint32, tag = "6")]
    pub target_state: u32,
    #[prost(uint32, tag = "7")]
    pub target_class: u32,
    #[prost(uint32, tag = "8")]
    pub max_len: u32,
    #[prost(message, repeated, tag = "9")]
    pub sources: Vec<SourceBlock>,
    #[prost(message, repeated, tag = "10")]
    pub fused_stations: Vec<FusedStation>,
}

impl WireRecord {
    pub fn track_status(&self) -> Option<TrackStatus> {
        TrackStatus::from_code(self.status)
    }

    pub fn class(&self) -> Option<TargetClass> {
        TargetClass::from_code(self.target_class)
    }
}

/// Kinematic and identity block. Tag numbers and the 32-bit float
/// encoding of course, speed and heading match records captured from the
/// fusion bus; unknown tags in captures are skipped.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct PositionBlock {
    #[prost(uint32, tag = "1")]
    pub display_id: u32,
    #[prost(uint64, tag = "2")]
    pub mobile_id: u64,
    #[prost(uint32, tag = "3")]
    pub station_id: u32,
    #[prost(uint32, tag = "4")]
    pub state: u32,
    #[prost(uint32, tag = "5")]
    pub quality: u32,
    #[prost(uint32, tag = "6")]
    pub period: u32,
    #[prost(message, optional, tag = "7")]
    pub point: Option<GeoPoint>,
    #[prost(float, tag = "8")]
    pub course: f32,
    #[prost(float, tag = "9")]
    pub speed: f32,
    #[prost(float, tag = "10")]
    pub heading: f32,
    #[prost(uint32, tag = "11")]
    pub length: u32,
    #[prost(uint32, tag = "13")]
    pub ship_type: u32,
    #[prost(uint32, tag = "14")]
    pub target_class: u32,
    #[prost(string, tag = "17")]
    pub vessel_name: String,
    #[prost(uint64, tag = "21")]
    pub id: u64,
    // extension; no tag in captured traffic
    #[prost(string, tag = "40")]
    pub satellite_id: String,
}

#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct GeoPoint {
    #[prost(double, tag = "1")]
    pub latitude: f64,
    #[prost(double, tag = "2")]
    pub longitude: f64,
}

/// Canonical per-channel source entry.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct SourceBlock {
    #[prost(string, tag = "1")]
    pub provider: String,
    #[prost(string, tag = "2")]
    #[serde(rename = "type")]
    pub kind: String,
    #[prost(string, repeated, tag = "3")]
    pub ids: Vec<String>,
}

/// One contributing sensor of a fused track.
#[derive(Clone, PartialEq, Message, Serialize, Deserialize)]
pub struct FusedStation {
    #[prost(uint64, tag = "1")]
    pub unique_id: u64,
    #[prost(uint32, tag = "2")]
    pub station_id: u32,
    #[prost(uint32, tag = "4")]
    pub station_type: u32,
    #[prost(uint64, tag = "5")]
    pub update_time: u64,
}
