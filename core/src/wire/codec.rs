//! Byte-level handling of bus payloads: optional deflate wrapping, protobuf
//! batch/record parsing and the hex text used when operators paste captures.

use crate::prelude::CodecError;
use crate::wire::record::{WireBatch, WireRecord};
use flate2::write::{DeflateEncoder, ZlibEncoder};
use flate2::{Decompress, FlushDecompress, Status};
use log::debug;
use prost::Message;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// Wrapping applied to an encoded batch before it goes on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Compression {
    #[default]
    None,
    Zlib,
    RawDeflate,
}

/// Message recovered from a payload.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedMessage {
    Batch(WireBatch),
    Single(WireRecord),
}

impl DecodedMessage {
    pub fn records(&self) -> Vec<&WireRecord> {
        match self {
            Self::Batch(batch) => batch.records.iter().collect(),
            Self::Single(record) => vec![record],
        }
    }

    pub fn to_json(&self) -> Result<String, CodecError> {
        let rendered = match self {
            Self::Batch(batch) => serde_json::to_string_pretty(batch),
            Self::Single(record) => serde_json::to_string_pretty(record),
        };
        rendered.map_err(|err| CodecError::Render(err.to_string()))
    }
}

/// Successful decode plus the notes describing which pipeline path was taken.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodeReport {
    pub message: DecodedMessage,
    pub compression: Compression,
    pub notes: Vec<String>,
}

/// Decodes a bus payload: zlib, then raw deflate, then the bytes as-is; a
/// non-empty batch is preferred over a single record.
pub fn decode(raw: &[u8]) -> Result<DecodeReport, CodecError> {
    let mut notes = Vec::new();
    let (payload, compression) = if let Some(bytes) = inflate(raw, true) {
        notes.push("inflated zlib stream".to_string());
        (bytes, Compression::Zlib)
    } else if let Some(bytes) = inflate(raw, false) {
        notes.push("inflated raw deflate stream".to_string());
        (bytes, Compression::RawDeflate)
    } else {
        notes.push("not deflate compressed; parsing bytes as-is".to_string());
        (raw.to_vec(), Compression::None)
    };

    if payload.is_empty() {
        return Err(CodecError::EmptyPayload { notes });
    }

    match WireBatch::decode(payload.as_slice()) {
        Ok(batch) if !batch.records.is_empty() => {
            notes.push(format!("parsed batch of {} record(s)", batch.records.len()));
            return Ok(DecodeReport {
                message: DecodedMessage::Batch(batch),
                compression,
                notes,
            });
        }
        Ok(_) => notes.push("batch parse yielded no records".to_string()),
        Err(err) => notes.push(format!("batch parse failed: {}", err)),
    }

    match WireRecord::decode(payload.as_slice()) {
        Ok(record) if record.encoded_len() > 0 => {
            notes.push("parsed single record".to_string());
            Ok(DecodeReport {
                message: DecodedMessage::Single(record),
                compression,
                notes,
            })
        }
        Ok(_) => {
            notes.push("record parse yielded an empty record".to_string());
            Err(unparseable(&payload, notes))
        }
        Err(err) => {
            notes.push(format!("record parse failed: {}", err));
            Err(unparseable(&payload, notes))
        }
    }
}

fn unparseable(payload: &[u8], notes: Vec<String>) -> CodecError {
    debug!("undecodable payload of {} bytes", payload.len());
    CodecError::Unparseable {
        len: payload.len(),
        notes,
        hex_dump: hex_dump(payload),
    }
}

/// Inflates a complete stream; `None` unless the stream ends exactly at the
/// end of the input.
fn inflate(data: &[u8], zlib_header: bool) -> Option<Vec<u8>> {
    if data.is_empty() {
        return None;
    }
    let mut inflater = Decompress::new(zlib_header);
    let mut out = Vec::with_capacity(data.len() * 4);

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity().max(256));
        }
        let consumed = inflater.total_in() as usize;
        let produced = inflater.total_out();
        match inflater.decompress_vec(&data[consumed..], &mut out, FlushDecompress::Finish) {
            Ok(Status::StreamEnd) => {
                return (inflater.total_in() as usize == data.len()).then_some(out);
            }
            Ok(_) => {
                let stalled = inflater.total_in() as usize == consumed
                    && inflater.total_out() == produced
                    && out.len() < out.capacity();
                if stalled {
                    return None;
                }
            }
            Err(_) => return None,
        }
    }
}

/// Decodes whitespace-tolerant hex text.
pub fn decode_hex(text: &str) -> Result<DecodeReport, CodecError> {
    let bytes = parse_hex(text)?;
    decode(&bytes)
}

/// Operator-facing helper: pretty JSON on success, diagnostic text on failure.
pub fn describe_hex(text: &str) -> Result<String, String> {
    decode_hex(text)
        .and_then(|report| report.message.to_json())
        .map_err(|err| err.diagnostic())
}

pub fn encode(batch: &WireBatch, compression: Compression) -> Result<Vec<u8>, CodecError> {
    let bytes = batch.encode_to_vec();
    match compression {
        Compression::None => Ok(bytes),
        Compression::Zlib => {
            let mut encoder = ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(&bytes)
                .map_err(|err| CodecError::Encode(err.to_string()))?;
            encoder
                .finish()
                .map_err(|err| CodecError::Encode(err.to_string()))
        }
        Compression::RawDeflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), flate2::Compression::default());
            encoder
                .write_all(&bytes)
                .map_err(|err| CodecError::Encode(err.to_string()))?;
            encoder
                .finish()
                .map_err(|err| CodecError::Encode(err.to_string()))
        }
    }
}

/// Encodes a batch and formats it as the spaced hex block operators paste.
pub fn encode_hex(batch: &WireBatch, compression: Compression) -> Result<String, CodecError> {
    Ok(hex_block(&encode(batch, compression)?, 30))
}

pub fn parse_hex(text: &str) -> Result<Vec<u8>, CodecError> {
    let digits: Vec<u8> = text
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    if digits.is_empty() {
        return Err(CodecError::EmptyInput);
    }
    if digits.len() % 2 != 0 {
        return Err(CodecError::InvalidHex(format!(
            "odd number of hex digits ({})",
            digits.len()
        )));
    }

    digits
        .chunks(2)
        .enumerate()
        .map(|(index, pair)| {
            let high = hex_value(pair[0]);
            let low = hex_value(pair[1]);
            match (high, low) {
                (Some(high), Some(low)) => Ok(high << 4 | low),
                _ => Err(CodecError::InvalidHex(format!(
                    "invalid digits {:?} at byte {}",
                    String::from_utf8_lossy(pair),
                    index
                ))),
            }
        })
        .collect()
}

fn hex_value(digit: u8) -> Option<u8> {
    char::from(digit).to_digit(16).map(|v| v as u8)
}

/// Contiguous lowercase hex, used in diagnostics.
pub fn hex_dump(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Uppercase hex with spaced bytes, `per_row` bytes per line.
pub fn hex_block(bytes: &[u8], per_row: usize) -> String {
    bytes
        .chunks(per_row.max(1))
        .map(|row| {
            row.iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect::<Vec<_>>()
        .join("\n")
}
