//! Wire-level decoding errors.

use thiserror::Error;

/// A message crossing the transport boundary did not have the expected shape.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Malformed server message: {0}")]
    MalformedMessage(String),

    #[error("Unknown server message type: {0}")]
    UnknownMessageType(String),

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),

    #[error("Invalid channel identifier: {0}")]
    InvalidIdentifier(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
