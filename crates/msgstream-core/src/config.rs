//! Adapter configuration.

use crate::message::TransferMode;
use std::time::Duration;

/// Initial settings for a [`StreamAdapter`](crate::StreamAdapter).
///
/// Both values can be changed on the adapter after construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AdapterConfig {
    /// Per-call timeout. `Duration::ZERO` disables it.
    pub timeout: Duration,
    /// Kind of outgoing messages.
    pub transfer_mode: TransferMode,
}

impl AdapterConfig {
    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the transfer mode.
    pub fn with_transfer_mode(mut self, transfer_mode: TransferMode) -> Self {
        self.transfer_mode = transfer_mode;
        self
    }
}
