//! Server error types.
//!
//! Every variant is recoverable: the dispatch boundary converts it into
//! a client-visible `ERROR` or `JOIN_ERROR` response and no failure
//! escapes to crash a background timer or another player's session.
//! The `Display` strings are the wire-visible error messages.

use protocol::ProtocolError;
use thiserror::Error;

/// Failures surfaced to the originating client.
#[derive(Debug, Error)]
pub enum GameError {
    #[error("The server could not deserialize the client's message")]
    Malformed(#[from] ProtocolError),

    #[error("Tried to add a client that already exists")]
    ClientAlreadyExists,

    #[error("This socket already exists")]
    SocketAlreadyExists,

    #[error("The provided gameCode was incorrect")]
    IncorrectGameCode,

    #[error("User had no corresponding game code")]
    UserNoGameCode,

    #[error("Game state cannot be found")]
    MissingGameState,

    #[error("Incorrect toRemove coordinate provided")]
    StaleTailMismatch,
}
