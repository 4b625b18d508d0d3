use crate::target::class::SourceChannel;

/// Legacy station-type codes carried in fused-station blocks.
///
/// The values are the ASCII codes of the channel initials that older
/// consumers switch on; they must not change.
pub const STATION_TYPE_CODES: [(SourceChannel, u32); 3] = [
    (SourceChannel::Ais, b'A' as u32),
    (SourceChannel::Radar, b'R' as u32),
    (SourceChannel::Satellite, b'B' as u32),
];

pub fn station_type_code(channel: SourceChannel) -> u32 {
    STATION_TYPE_CODES
        .iter()
        .find(|(c, _)| *c == channel)
        .map(|(_, code)| *code)
        .unwrap_or_default()
}

pub fn channel_for_code(code: u32) -> Option<SourceChannel> {
    STATION_TYPE_CODES
        .iter()
        .find(|(_, c)| *c == code)
        .map(|(channel, _)| *channel)
}
