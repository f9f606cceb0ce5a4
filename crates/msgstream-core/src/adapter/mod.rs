//! Byte-stream adapter over a message transport.
//!
//! ## Message to stream mapping
//!
//! - `write(buf)` sends `buf` as exactly one message and reports `buf.len()`
//! - `read(buf)` delivers bytes of one message at a time; when a message does
//!   not fit, the unread tail is retained and returned by the following reads
//!   before the transport is asked for another message
//!
//! ## Cancellation and deadlines
//!
//! Every call first checks the adapter's scope (merged from the connection
//! scope and the request scope at construction). The transport call then
//! races the scope and, if a timeout is configured, a deadline created for
//! that call alone.
//!
//! [`AdapterStream`] exposes the same contract through `tokio::io`.

use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use crate::message::TransferMode;
use crate::scope::{CancelCause, Scope};
use crate::transport::MessageTransport;
use bytes::Bytes;
use std::future::Future;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, trace};

mod io;

pub use io::AdapterStream;

/// Stream-style view of one message transport connection.
///
/// `read` and `write` take `&self`: one reader task and one writer task can
/// share the adapter behind an `Arc`. Concurrent reads are serialized by the
/// adapter; concurrent writes are not, and must be serialized by the caller
/// if the transport requires it.
///
/// # Example
///
/// ```no_run
/// use msgstream_core::{MessageTransport, Scope, StreamAdapter, TransferMode};
/// use std::time::Duration;
///
/// # async fn example(transport: impl MessageTransport) -> msgstream_core::Result<()> {
/// let connection = Scope::new();
/// let request = Scope::new();
/// let adapter = StreamAdapter::new(&connection, &request, "conn-1", transport);
/// adapter.set_timeout(Duration::from_secs(5));
/// adapter.set_transfer_mode(TransferMode::Binary);
///
/// adapter.write(b"ping").await?;
/// let mut buf = [0u8; 512];
/// let n = adapter.read(&mut buf).await?;
/// # let _ = n;
/// # Ok(())
/// # }
/// ```
pub struct StreamAdapter<T> {
    connection_id: String,
    scope: Scope,
    /// Per-call timeout in nanoseconds; zero disables it.
    timeout_nanos: AtomicU64,
    transfer_mode: AtomicU8,
    transport: T,
    /// Undelivered tail of the last received message.
    remainder: Mutex<Bytes>,
}

impl<T: MessageTransport> StreamAdapter<T> {
    /// Create an adapter with default configuration.
    ///
    /// # Arguments
    ///
    /// * `parent` - Scope of the whole connection
    /// * `request` - Scope of the operation that established the connection
    /// * `connection_id` - Identifier used in errors and logs
    /// * `transport` - Established message transport
    pub fn new(
        parent: &Scope,
        request: &Scope,
        connection_id: impl Into<String>,
        transport: T,
    ) -> Self {
        Self::with_config(
            parent,
            request,
            connection_id,
            transport,
            AdapterConfig::default(),
        )
    }

    /// Create an adapter with custom configuration.
    pub fn with_config(
        parent: &Scope,
        request: &Scope,
        connection_id: impl Into<String>,
        transport: T,
        config: AdapterConfig,
    ) -> Self {
        let adapter = Self {
            connection_id: connection_id.into(),
            scope: Scope::merge(parent, request),
            timeout_nanos: AtomicU64::new(0),
            transfer_mode: AtomicU8::new(config.transfer_mode.to_u8()),
            transport,
            remainder: Mutex::new(Bytes::new()),
        };
        adapter.set_timeout(config.timeout);
        adapter
    }

    /// Write `buf` as one message.
    ///
    /// The message kind follows the current [`TransferMode`]. On success the
    /// whole buffer was sent and `buf.len()` is returned.
    ///
    /// # Errors
    ///
    /// - `Error::Canceled` if the scope is or becomes canceled
    /// - `Error::TimedOut` if the per-call timeout elapses
    /// - `Error::Transport` for any transport failure
    pub async fn write(&self, buf: &[u8]) -> Result<usize> {
        self.ensure_live()?;

        let kind = self.transfer_mode().message_kind();
        self.bounded(async {
            self.transport
                .send_message(kind, buf)
                .await
                .map_err(Error::from)
        })
        .await?;

        trace!(
            connection_id = %self.connection_id,
            ?kind,
            len = buf.len(),
            "message sent"
        );
        Ok(buf.len())
    }

    /// Read bytes into `buf`.
    ///
    /// Returns the number of bytes copied. If the current message does not
    /// fit, the rest is kept for the next call. Empty messages carry no
    /// stream bytes and are skipped. An empty `buf` returns `Ok(0)` without
    /// touching the transport.
    ///
    /// # Errors
    ///
    /// - `Error::Canceled` if the scope is or becomes canceled
    /// - `Error::TimedOut` if the per-call timeout elapses
    /// - `Error::Transport` for any transport failure
    pub async fn read(&self, buf: &mut [u8]) -> Result<usize> {
        self.ensure_live()?;
        if buf.is_empty() {
            return Ok(0);
        }

        self.bounded(async {
            let mut remainder = self.remainder.lock().await;
            if remainder.is_empty() {
                // No await between receipt and store: a message handed over
                // by the transport is never lost to cancellation.
                *remainder = self.receive_payload().await?;
            }

            let n = remainder.len().min(buf.len());
            buf[..n].copy_from_slice(&remainder.split_to(n));
            if !remainder.is_empty() {
                trace!(
                    connection_id = %self.connection_id,
                    delivered = n,
                    retained = remainder.len(),
                    "partial message read"
                );
            }
            Ok::<_, Error>(n)
        })
        .await
    }

    /// Receive the next message with a non-empty payload.
    async fn receive_payload(&self) -> Result<Bytes> {
        loop {
            let message = self.transport.receive_message().await?;
            trace!(
                connection_id = %self.connection_id,
                kind = ?message.kind,
                len = message.len(),
                "message received"
            );
            if !message.is_empty() {
                return Ok(message.payload);
            }
        }
    }

    /// Run `op` against the scope and, when configured, a deadline for this call.
    async fn bounded<R, F>(&self, op: F) -> Result<R>
    where
        F: Future<Output = Result<R>>,
    {
        let timeout = self.timeout();
        let guarded = async {
            tokio::select! {
                biased;
                _ = self.scope.canceled() => Err(self.canceled_error()),
                result = op => result,
            }
        };

        if timeout.is_zero() {
            return guarded.await;
        }

        match tokio::time::timeout(timeout, guarded).await {
            Ok(result) => result,
            Err(_) => {
                debug!(connection_id = %self.connection_id, ?timeout, "operation timed out");
                Err(Error::TimedOut {
                    connection_id: self.connection_id.clone(),
                    timeout,
                })
            }
        }
    }

    fn ensure_live(&self) -> Result<()> {
        if self.scope.is_canceled() {
            return Err(self.canceled_error());
        }
        Ok(())
    }

    fn canceled_error(&self) -> Error {
        let cause = self.scope.cause().unwrap_or(CancelCause::Canceled);
        debug!(connection_id = %self.connection_id, %cause, "operation canceled");
        Error::Canceled {
            connection_id: self.connection_id.clone(),
            cause,
        }
    }
}

impl<T> StreamAdapter<T> {
    /// Connection identifier given at construction.
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Merged scope of this adapter.
    ///
    /// Canceling it cancels every current and future operation of this
    /// adapter without affecting the scopes it was merged from.
    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    /// Current per-call timeout (`Duration::ZERO` when disabled).
    pub fn timeout(&self) -> Duration {
        Duration::from_nanos(self.timeout_nanos.load(Ordering::Relaxed))
    }

    /// Set the per-call timeout. Takes effect for calls started afterwards.
    pub fn set_timeout(&self, timeout: Duration) {
        let nanos = u64::try_from(timeout.as_nanos()).unwrap_or(u64::MAX);
        self.timeout_nanos.store(nanos, Ordering::Relaxed);
    }

    /// Current transfer mode.
    pub fn transfer_mode(&self) -> TransferMode {
        TransferMode::from_u8(self.transfer_mode.load(Ordering::Relaxed))
    }

    /// Set the transfer mode. Takes effect for writes started afterwards.
    pub fn set_transfer_mode(&self, transfer_mode: TransferMode) {
        self.transfer_mode
            .store(transfer_mode.to_u8(), Ordering::Relaxed);
    }

    /// Bytes of a partially read message still waiting to be delivered.
    ///
    /// Returns `None` while a read is in progress, since the remainder is
    /// being consumed.
    pub fn buffered_len(&self) -> Option<usize> {
        self.remainder.try_lock().ok().map(|r| r.len())
    }

    /// Consume the adapter and return the transport.
    ///
    /// Any retained remainder is discarded.
    pub fn into_transport(self) -> T {
        self.transport
    }
}

impl<T> std::fmt::Debug for StreamAdapter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamAdapter")
            .field("connection_id", &self.connection_id)
            .field("timeout", &self.timeout())
            .field("transfer_mode", &self.transfer_mode())
            .field("canceled", &self.scope.is_canceled())
            .finish_non_exhaustive()
    }
}
