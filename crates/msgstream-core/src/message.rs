//! Message kinds, transfer modes and the message unit exchanged with transports.

use bytes::Bytes;

/// Kind tag carried by every transport message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// UTF-8 text message.
    Text,
    /// Opaque binary message.
    Binary,
}

/// Kind used for messages produced by `write`.
///
/// Does not influence how incoming messages are interpreted: `read` delivers
/// the payload bytes of text and binary messages alike.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransferMode {
    /// Outgoing messages are sent as text.
    #[default]
    Text,
    /// Outgoing messages are sent as binary.
    Binary,
}

impl TransferMode {
    /// Message kind used when writing in this mode.
    pub fn message_kind(self) -> MessageKind {
        match self {
            TransferMode::Binary => MessageKind::Binary,
            TransferMode::Text => MessageKind::Text,
        }
    }

    /// Convert to the compact form stored by the adapter.
    pub(crate) fn to_u8(self) -> u8 {
        match self {
            TransferMode::Text => 0,
            TransferMode::Binary => 1,
        }
    }

    /// Convert from the compact form. Unknown values fall back to text.
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => TransferMode::Binary,
            _ => TransferMode::Text,
        }
    }
}

/// One discrete message received from a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Kind tag of the message.
    pub kind: MessageKind,
    /// Message payload.
    pub payload: Bytes,
}

impl Message {
    /// Create a message of the given kind.
    pub fn new(kind: MessageKind, payload: impl Into<Bytes>) -> Self {
        Self {
            kind,
            payload: payload.into(),
        }
    }

    /// Create a text message.
    pub fn text(payload: impl Into<Bytes>) -> Self {
        Self::new(MessageKind::Text, payload)
    }

    /// Create a binary message.
    pub fn binary(payload: impl Into<Bytes>) -> Self {
        Self::new(MessageKind::Binary, payload)
    }

    /// Payload length in bytes.
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
