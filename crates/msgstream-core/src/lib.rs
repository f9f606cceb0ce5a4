//! Core of the msgstream message-to-stream adapter.
//!
//! This crate bridges message-oriented transports (each send/receive moves one
//! discrete text or binary message) to a byte-stream read/write contract:
//! - Cancellation scopes that merge two independently owned lifetimes
//! - Per-call timeouts layered on the long-lived scope
//! - Remainder retention so messages larger than the read buffer are never truncated
//! - Transfer mode selection (text vs. binary) for outgoing messages
//!
//! Concrete transports live in `msgstream-transport`; anything implementing
//! [`MessageTransport`] can be wrapped in a [`StreamAdapter`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod config;
pub mod error;
pub mod message;
pub mod scope;
pub mod transport;

pub use adapter::{AdapterStream, StreamAdapter};
pub use config::AdapterConfig;
pub use error::{Error, Result, TransportError};
pub use message::{Message, MessageKind, TransferMode};
pub use scope::{CancelCause, Scope};
pub use transport::MessageTransport;
