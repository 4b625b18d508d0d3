use crate::target::snapshot::TargetSnapshot;
use crate::wire::record::{FusedStation, GeoPoint, PositionBlock, SourceBlock, WireBatch, WireRecord};
use crate::wire::station::station_type_code;
use serde::{Deserialize, Serialize};

const DISPLAY_ID_MODULUS: u64 = 100_000;

/// Static values stamped into every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub quality: u32,
    pub period: u32,
    pub provider: String,
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            quality: 100,
            period: 10,
            provider: "SIM".to_string(),
        }
    }
}

/// Maps a target snapshot onto the wire schema. Pure: identifiers must
/// already be populated by the controller.
#[derive(Debug, Clone, Default)]
pub struct MessageAssembler {
    config: AssemblerConfig,
}

impl MessageAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    pub fn assemble(&self, snapshot: &TargetSnapshot, timestamp_ms: u64) -> WireRecord {
        let radar_only = snapshot.class.is_radar_only();
        let kinematics = &snapshot.kinematics;

        let pos = PositionBlock {
            display_id: (snapshot.id % DISPLAY_ID_MODULUS) as u32,
            mobile_id: if radar_only { 0 } else { snapshot.mobile_id },
            station_id: primary_radar_station(snapshot),
            state: snapshot.target_state,
            quality: self.config.quality,
            period: self.config.period,
            point: Some(GeoPoint {
                latitude: kinematics.position.latitude,
                longitude: kinematics.position.longitude,
            }),
            course: kinematics.course_deg as f32,
            speed: kinematics.speed_knots as f32,
            heading: kinematics.course_deg as f32,
            length: snapshot.length,
            ship_type: snapshot.ship_type,
            target_class: snapshot.class.code(),
            vessel_name: snapshot.reported_name().to_string(),
            id: snapshot.id,
            satellite_id: if radar_only {
                String::new()
            } else {
                snapshot.satellite_id.clone()
            },
        };

        let mut sources = Vec::new();
        let mut fused_stations = Vec::new();
        for (channel, ids) in snapshot.sources.iter() {
            sources.push(SourceBlock {
                provider: self.config.provider.clone(),
                kind: channel.wire_type().to_string(),
                ids: ids.to_vec(),
            });
            let station_type = station_type_code(channel);
            fused_stations.extend(ids.iter().map(|source_id| FusedStation {
                unique_id: snapshot.id,
                station_id: source_id.parse().unwrap_or_default(),
                station_type,
                update_time: timestamp_ms,
            }));
        }

        WireRecord {
            id: snapshot.id,
            pos: Some(pos),
            status: snapshot.status.code(),
            timestamp_ms,
            adapter: snapshot.adapter,
            target_state: snapshot.target_state,
            target_class: snapshot.class.code(),
            max_len: snapshot.max_length,
            sources,
            fused_stations,
        }
    }

    /// Single-record batch, the envelope published on the bus.
    pub fn assemble_batch(&self, snapshot: &TargetSnapshot, timestamp_ms: u64) -> WireBatch {
        WireBatch {
            records: vec![self.assemble(snapshot, timestamp_ms)],
        }
    }
}

fn primary_radar_station(snapshot: &TargetSnapshot) -> u32 {
    snapshot
        .sources
        .radar
        .iter()
        .find_map(|id| id.parse().ok())
        .unwrap_or_default()
}
