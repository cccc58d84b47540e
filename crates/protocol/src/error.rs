//! Protocol error types.

use thiserror::Error;

/// Errors that can occur while encoding or decoding messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("could not deserialize message: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("could not serialize message: {0}")]
    Encode(#[source] serde_json::Error),
}
