use crate::controller::form::{FormField, OperatorForm};
use crate::target::identity::IdentityKind;
use serde::{Deserialize, Serialize};

/// Required fields that are missing or not numeric.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid or missing fields: {}", display_fields(.fields))]
pub struct ValidationError {
    pub fields: Vec<FormField>,
}

fn display_fields(fields: &[FormField]) -> String {
    fields
        .iter()
        .map(|field| field.label())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Identifier template misconfiguration.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentityError {
    #[error("{kind} template length {length} must exceed prefix \"{prefix}\"")]
    TooShort {
        kind: IdentityKind,
        prefix: String,
        length: usize,
    },
    #[error("{kind} template prefix \"{prefix}\" must be decimal digits")]
    InvalidPrefix { kind: IdentityKind, prefix: String },
    #[error("{kind} template of length {length} does not fit a 64-bit identifier")]
    Overflow { kind: IdentityKind, length: usize },
}

/// Failure of a controller transition. The controller state is unchanged.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("cannot recompute kinematics: {0}")]
    Compute(String),
    #[error(transparent)]
    Identity(#[from] IdentityError),
    #[error("no open track")]
    NoOpenTrack,
}

/// Operator form edits rejected by the form itself.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("field {0} is locked while awaiting association")]
    Locked(FormField),
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CodecError {
    #[error("input is empty")]
    EmptyInput,
    #[error("invalid hex text: {0}")]
    InvalidHex(String),
    #[error("payload is empty after decompression")]
    EmptyPayload { notes: Vec<String> },
    #[error("unable to parse {len} bytes as a wire batch or record; bytes: {hex_dump}")]
    Unparseable {
        len: usize,
        notes: Vec<String>,
        hex_dump: String,
    },
    #[error("encoding failed: {0}")]
    Encode(String),
    #[error("rendering failed: {0}")]
    Render(String),
}

impl CodecError {
    /// Pipeline notes followed by the error itself, one per line.
    pub fn diagnostic(&self) -> String {
        let notes: &[String] = match self {
            Self::EmptyPayload { notes } | Self::Unparseable { notes, .. } => notes,
            _ => &[],
        };
        notes
            .iter()
            .cloned()
            .chain(std::iter::once(format!("error: {}", self)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error("publisher is not connected")]
    NotConnected,
    #[error("publish to {topic} failed: {reason}")]
    Rejected { topic: String, reason: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Acknowledgement returned by a [`Publisher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishAck {
    pub topic: String,
    pub bytes: usize,
    pub offset: Option<u64>,
}

/// Message-bus producer. May block briefly on acknowledgement.
pub trait Publisher {
    fn publish(&mut self, topic: &str, payload: &[u8]) -> Result<PublishAck, TransportError>;
}

/// Operator surface consulted by the controller.
pub trait OperatorInput {
    fn form(&self) -> &OperatorForm;

    /// Asked at termination when "keep motion trend" is enabled.
    fn confirm_association(&mut self) -> bool;
}
