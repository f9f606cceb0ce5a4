//! `tokio::io` view of a [`StreamAdapter`].

use super::StreamAdapter;
use crate::error::Result;
use crate::transport::MessageTransport;
use bytes::Bytes;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{ready, Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

type OpFuture<R> = Pin<Box<dyn Future<Output = Result<R>> + Send>>;

/// [`AsyncRead`] + [`AsyncWrite`] wrapper around a shared adapter.
///
/// Each `poll_write` maps to one adapter `write`, so every buffer handed to
/// the writer still becomes one message. Adapter errors surface as
/// [`io::Error`] through `From<Error>`.
///
/// # Example
///
/// ```no_run
/// use msgstream_core::adapter::AdapterStream;
/// use msgstream_core::{MessageTransport, Scope, StreamAdapter};
/// use std::sync::Arc;
/// use tokio::io::AsyncWriteExt;
///
/// # async fn example(transport: impl MessageTransport + 'static) -> std::io::Result<()> {
/// let scope = Scope::new();
/// let adapter = StreamAdapter::new(&scope, &scope.child(), "conn-1", transport);
/// let mut stream = AdapterStream::new(Arc::new(adapter));
/// stream.write_all(b"hello").await?;
/// # Ok(())
/// # }
/// ```
pub struct AdapterStream<T> {
    adapter: Arc<StreamAdapter<T>>,
    read: Option<OpFuture<Bytes>>,
    /// Bytes read by the adapter that did not fit the caller's buffer.
    pending: Bytes,
    write: Option<OpFuture<usize>>,
}

impl<T: MessageTransport + 'static> AdapterStream<T> {
    /// Wrap a shared adapter.
    pub fn new(adapter: Arc<StreamAdapter<T>>) -> Self {
        Self {
            adapter,
            read: None,
            pending: Bytes::new(),
            write: None,
        }
    }

    /// The wrapped adapter.
    pub fn adapter(&self) -> &Arc<StreamAdapter<T>> {
        &self.adapter
    }

    fn poll_pending_write(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<Option<usize>>> {
        let Some(op) = self.write.as_mut() else {
            return Poll::Ready(Ok(None));
        };
        let result = ready!(op.as_mut().poll(cx));
        self.write = None;
        Poll::Ready(result.map(Some).map_err(io::Error::from))
    }
}

impl<T: MessageTransport + 'static> From<StreamAdapter<T>> for AdapterStream<T> {
    fn from(adapter: StreamAdapter<T>) -> Self {
        Self::new(Arc::new(adapter))
    }
}

impl<T: MessageTransport + 'static> AsyncRead for AdapterStream<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if buf.remaining() == 0 {
            return Poll::Ready(Ok(()));
        }

        if this.pending.is_empty() {
            let op = this.read.get_or_insert_with(|| {
                let adapter = Arc::clone(&this.adapter);
                let capacity = buf.remaining();
                Box::pin(async move {
                    let mut chunk = vec![0u8; capacity];
                    let n = adapter.read(&mut chunk).await?;
                    chunk.truncate(n);
                    Ok(Bytes::from(chunk))
                })
            });
            let result = ready!(op.as_mut().poll(cx));
            this.read = None;
            this.pending = result.map_err(io::Error::from)?;
        }

        let n = this.pending.len().min(buf.remaining());
        buf.put_slice(&this.pending.split_to(n));
        Poll::Ready(Ok(()))
    }
}

impl<T: MessageTransport + 'static> AsyncWrite for AdapterStream<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.write.is_none() {
            let adapter = Arc::clone(&this.adapter);
            let message = buf.to_vec();
            this.write = Some(Box::pin(async move { adapter.write(&message).await }));
        }
        // A pending write is resumed by the caller's retry with the same buffer.
        let written = ready!(this.poll_pending_write(cx))?;
        Poll::Ready(Ok(written.unwrap_or(0)))
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        ready!(self.get_mut().poll_pending_write(cx))?;
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        self.poll_flush(cx)
    }
}

impl<T> std::fmt::Debug for AdapterStream<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterStream")
            .field("adapter", &self.adapter)
            .field("pending", &self.pending.len())
            .field("reading", &self.read.is_some())
            .field("writing", &self.write.is_some())
            .finish()
    }
}
