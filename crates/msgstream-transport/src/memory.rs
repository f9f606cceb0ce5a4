//! In-memory message transport.
//!
//! [`pair`] returns two connected endpoints backed by bounded tokio channels.
//! Messages keep their kind and boundaries exactly as sent.

use async_trait::async_trait;
use msgstream_core::{Message, MessageKind, MessageTransport, TransportError};
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// One end of an in-memory connection.
///
/// Closing either end (or dropping it) makes the peer's receives fail with
/// `TransportError::Closed` once already queued messages are drained.
pub struct MemoryTransport {
    tx: mpsc::Sender<Message>,
    rx: Mutex<mpsc::Receiver<Message>>,
    /// Shared by both ends of the pair.
    closed: CancellationToken,
}

/// Create a connected pair of in-memory transports.
///
/// # Arguments
///
/// * `capacity` - Messages buffered per direction before `send_message` waits
///   (a capacity of 0 is raised to 1)
///
/// # Example
///
/// ```
/// use msgstream_core::{MessageKind, MessageTransport};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), msgstream_core::TransportError> {
/// let (client, server) = msgstream_transport::memory::pair(8);
/// client.send_message(MessageKind::Text, b"hello").await?;
/// let msg = server.receive_message().await?;
/// assert_eq!(msg.payload.as_ref(), b"hello");
/// # Ok(())
/// # }
/// ```
pub fn pair(capacity: usize) -> (MemoryTransport, MemoryTransport) {
    let capacity = capacity.max(1);
    let (a_tx, a_rx) = mpsc::channel(capacity);
    let (b_tx, b_rx) = mpsc::channel(capacity);
    let closed = CancellationToken::new();

    let a = MemoryTransport {
        tx: a_tx,
        rx: Mutex::new(b_rx),
        closed: closed.clone(),
    };
    let b = MemoryTransport {
        tx: b_tx,
        rx: Mutex::new(a_rx),
        closed,
    };
    (a, b)
}

impl MemoryTransport {
    /// Close the connection for both ends.
    pub fn close(&self) {
        if !self.closed.is_cancelled() {
            debug!("memory transport closed");
        }
        self.closed.cancel();
    }

    /// Whether the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

#[async_trait]
impl MessageTransport for MemoryTransport {
    async fn send_message(
        &self,
        kind: MessageKind,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        if self.closed.is_cancelled() {
            return Err(TransportError::Closed);
        }
        let message = Message::new(kind, payload.to_vec());
        tokio::select! {
            biased;
            _ = self.closed.cancelled() => Err(TransportError::Closed),
            sent = self.tx.send(message) => sent.map_err(|_| TransportError::Closed),
        }
    }

    async fn receive_message(&self) -> Result<Message, TransportError> {
        let mut rx = self.rx.lock().await;
        // Queued messages are drained before close is reported.
        tokio::select! {
            biased;
            message = rx.recv() => message.ok_or(TransportError::Closed),
            _ = self.closed.cancelled() => match rx.try_recv() {
                Ok(message) => Ok(message),
                Err(_) => Err(TransportError::Closed),
            },
        }
    }
}

impl Drop for MemoryTransport {
    fn drop(&mut self) {
        self.closed.cancel();
    }
}
