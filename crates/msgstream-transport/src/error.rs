//! Transport layer errors.

use thiserror::Error;

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;

/// Errors establishing or tearing down transport connections.
///
/// Errors of individual message operations are reported as
/// [`msgstream_core::TransportError`].
#[derive(Debug, Error)]
pub enum Error {
    /// Connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid endpoint configuration or usage.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Message operation error.
    #[error("Transport error: {0}")]
    Transport(#[from] msgstream_core::TransportError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
