//! Error types for the IMAP client interface.

use thiserror::Error;

/// Errors reported by a retrieval-protocol connection.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error during network operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Server returned NO response.
    #[error("Server returned NO: {0}")]
    No(String),

    /// Server returned BAD response.
    #[error("Server returned BAD: {0}")]
    Bad(String),

    /// Server sent BYE (disconnecting).
    #[error("Server sent BYE: {0}")]
    Bye(String),

    /// The connection is already closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Invalid state for the requested operation.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Protocol violation or unexpected data.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Endpoint configuration could not be parsed.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl Error {
    /// Returns true if the error means the connection is gone or unusable,
    /// as opposed to the server rejecting one command.
    #[must_use]
    pub const fn is_disconnect(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Bye(_) | Self::ConnectionClosed)
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
