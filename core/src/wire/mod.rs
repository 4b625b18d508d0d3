pub mod codec;
pub mod record;
pub mod station;

pub use codec::{decode, decode_hex, describe_hex, encode, encode_hex, Compression, DecodeReport, DecodedMessage};
pub use record::{FusedStation, GeoPoint, PositionBlock, SourceBlock, WireBatch, WireRecord};
pub use station::{channel_for_code, station_type_code};
