//! Error types for adapter and transport operations.

use crate::scope::CancelCause;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for adapter operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Adapter operation errors.
///
/// A failed `read` or `write` always transferred zero bytes.
#[derive(Debug, Error)]
pub enum Error {
    /// The adapter's scope was canceled before or during the call.
    #[error("Connection {connection_id} canceled: {cause}")]
    Canceled {
        /// Connection the operation belonged to.
        connection_id: String,
        /// Why the scope was canceled.
        #[source]
        cause: CancelCause,
    },

    /// The per-call deadline elapsed before the transport completed.
    #[error("Connection {connection_id} timed out after {timeout:?}")]
    TimedOut {
        /// Connection the operation belonged to.
        connection_id: String,
        /// Timeout that was in effect for the call.
        timeout: Duration,
    },

    /// Failure surfaced by the underlying transport, passed through as-is.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl Error {
    /// Whether this error reports cancellation of the adapter's scope.
    pub fn is_canceled(&self) -> bool {
        matches!(self, Error::Canceled { .. })
    }

    /// Whether this error reports an elapsed per-call deadline.
    pub fn is_timed_out(&self) -> bool {
        matches!(self, Error::TimedOut { .. })
    }

    /// The transport error, if this is one.
    pub fn as_transport(&self) -> Option<&TransportError> {
        match self {
            Error::Transport(e) => Some(e),
            _ => None,
        }
    }
}

/// Cancellation is terminal and maps to `ConnectionAborted`, never to the
/// retryable `Interrupted`.
impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;

        let kind = match &err {
            Error::Canceled { .. } => ErrorKind::ConnectionAborted,
            Error::TimedOut { .. } => ErrorKind::TimedOut,
            Error::Transport(TransportError::Closed) => ErrorKind::ConnectionAborted,
            Error::Transport(TransportError::Protocol(_)) => ErrorKind::InvalidData,
            Error::Transport(TransportError::Io(io)) => io.kind(),
            Error::Transport(TransportError::Other(_)) => ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}

/// Errors reported by a [`MessageTransport`](crate::MessageTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection is closed (by either peer).
    #[error("Connection closed")]
    Closed,

    /// The peer violated the transport's protocol.
    #[error("Protocol violation: {0}")]
    Protocol(String),

    /// I/O error from the underlying socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Any other transport-specific failure.
    #[error("Transport error: {0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}
