//! Message transports for msgstream adapters.
//!
//! Implements [`MessageTransport`](msgstream_core::MessageTransport) backends:
//! - In-memory connected pair (in-process pipelines, tests)
//! - WebSocket over TCP via `tokio-tungstenite` (text and binary messages)
//!
//! Wrap any of them in a [`StreamAdapter`](msgstream_core::StreamAdapter) to
//! get byte-stream reads and writes.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;

#[cfg(feature = "memory")]
pub mod memory;

#[cfg(feature = "websocket")]
pub mod websocket;

pub use error::{Error, Result};
