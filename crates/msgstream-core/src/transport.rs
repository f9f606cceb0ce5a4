//! Message transport abstraction consumed by the adapter.

use crate::error::TransportError;
use crate::message::{Message, MessageKind};
use async_trait::async_trait;
use std::sync::Arc;

/// A duplex channel that sends and receives whole messages.
///
/// Implementations:
/// - WebSocket (`msgstream_transport::websocket::WebSocketTransport`)
/// - In-process channel pair (`msgstream_transport::memory::MemoryTransport`)
///
/// # Cancellation
///
/// Deadlines and cancellation reach the transport by dropping the in-flight
/// future. Implementations should tolerate a dropped `receive_message` without
/// losing a message they have not yet returned.
///
/// # Concurrency
///
/// One `send_message` and one `receive_message` may run concurrently. Calls of
/// the same direction are expected to be serialized by the caller.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Send `payload` as exactly one message of the given kind.
    ///
    /// # Errors
    ///
    /// Returns error if the connection is closed or the send fails.
    async fn send_message(&self, kind: MessageKind, payload: &[u8])
        -> Result<(), TransportError>;

    /// Wait for the next message.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Closed` once the connection is closed, or any
    /// other transport failure.
    async fn receive_message(&self) -> Result<Message, TransportError>;
}

#[async_trait]
impl<T: MessageTransport + ?Sized> MessageTransport for Arc<T> {
    async fn send_message(
        &self,
        kind: MessageKind,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        (**self).send_message(kind, payload).await
    }

    async fn receive_message(&self) -> Result<Message, TransportError> {
        (**self).receive_message().await
    }
}

#[async_trait]
impl<T: MessageTransport + ?Sized> MessageTransport for Box<T> {
    async fn send_message(
        &self,
        kind: MessageKind,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        (**self).send_message(kind, payload).await
    }

    async fn receive_message(&self) -> Result<Message, TransportError> {
        (**self).receive_message().await
    }
}
