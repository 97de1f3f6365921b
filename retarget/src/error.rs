//! Error types for session operations.

use thiserror::Error;

use crate::types::{ConnectionState, StreamingMode};

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors returned by [`crate::Session`] calls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// The configured peer address is not an IP literal or `ip:port`.
    #[error("invalid peer address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    /// A connection is already open or being opened.
    #[error("connection is already opened ({state}) to {peer}")]
    AlreadyOpen {
        peer: String,
        state: ConnectionState,
    },

    /// `disconnect` was called with no open connection.
    #[error("connection is already closed")]
    AlreadyClosed,

    /// The operation needs a connected session.
    #[error("not connected")]
    NotConnected,

    /// No peer joint matched a scene node.
    #[error("no scene node matched any of the {requested} peer joints in {mode} mode")]
    MappingFailed {
        requested: usize,
        mode: StreamingMode,
    },

    /// An outbound packet could not be encoded.
    #[error(transparent)]
    Encode(#[from] wire::EncodeError),
}
