//! Error types for wire format operations.

use std::fmt;

use thiserror::Error;

/// Result type for wire format operations.
pub type WireResult<T> = Result<T, DecodeError>;

/// High-level decode errors for framing and packet decoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum DecodeError {
    /// A fragment could not be parsed as JSON and was dropped.
    #[error("malformed json fragment ({dropped} bytes dropped): {reason}")]
    MalformedJson { dropped: usize, reason: String },

    /// Top-level value is not an object or an array of objects.
    #[error("expected a json object, found {found}")]
    NotAnObject { found: &'static str },

    /// Packet object carries no `Type` string.
    #[error("packet has no \"Type\" field")]
    MissingType,

    /// Packet type is not one this side understands.
    #[error("unknown packet type: {found}")]
    UnknownType { found: String },

    /// Packet body does not match the declared type.
    #[error("invalid {packet_type} packet: {reason}")]
    InvalidPacket {
        packet_type: &'static str,
        reason: String,
    },

    /// Limits exceeded.
    #[error("{kind} limit exceeded: {actual} > {limit}")]
    LimitsExceeded {
        kind: LimitKind,
        limit: usize,
        actual: usize,
    },
}

/// Specific wire limits that can be exceeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    BufferBytes,
    FrameBytes,
    JointsPerPacket,
}

/// Errors that can occur during encoding.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    #[error("cannot serialize {packet_type} packet: {reason}")]
    Serialize {
        packet_type: &'static str,
        reason: String,
    },
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::BufferBytes => "reassembly buffer bytes",
            Self::FrameBytes => "frame bytes",
            Self::JointsPerPacket => "joints per packet",
        };
        write!(f, "{name}")
    }
}
