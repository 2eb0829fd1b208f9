//! Error types for the bind broker client.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Main error type for client construction and bind exchanges.
///
/// Every variant is local to a single call. Nothing is retried internally.
#[derive(Error, Debug)]
pub enum BinderError {
    /// Invalid client or file configuration.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// The random source could not produce an identifier.
    #[error("Randomness error: {message}")]
    Randomness { message: String },

    /// Could not connect to the broker socket within the timeout.
    #[error("Failed to connect to broker at {}: {source}", .path.display())]
    Connect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The request could not be written in full.
    #[error("Failed to write bind request: {0}")]
    Write(#[source] io::Error),

    /// The combined payload and control data receive failed.
    #[error("Failed to read bind response: {0}")]
    Read(#[source] io::Error),

    /// The request envelope could not be serialized.
    #[error("Failed to encode bind request: {0}")]
    Encode(#[source] serde_json::Error),

    /// The response payload is not a valid response envelope.
    #[error("Failed to decode bind response: {0}")]
    Decode(#[source] serde_json::Error),

    /// The broker rejected the request.
    #[error("Broker error: {message}")]
    Broker { message: String },

    /// The I/O runtime could not be started, or could not take over a
    /// received socket.
    #[error("I/O runtime error: {0}")]
    Runtime(#[source] io::Error),

    /// Payload and ancillary data disagree.
    #[error("Protocol error: {kind}")]
    Protocol { kind: ProtocolErrorKind },
}

/// Protocol error kinds.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolErrorKind {
    #[error("unexpected control message count: expected 1, got {count}")]
    UnexpectedControlMessageCount { count: usize },

    #[error("unexpected descriptor count: expected 1, got {count}")]
    UnexpectedDescriptorCount { count: usize },

    #[error("control data truncated by the kernel")]
    ControlDataTruncated,
}

impl From<ProtocolErrorKind> for BinderError {
    fn from(kind: ProtocolErrorKind) -> Self {
        BinderError::Protocol { kind }
    }
}

/// Result type alias for client operations.
pub type BinderResult<T> = Result<T, BinderError>;
