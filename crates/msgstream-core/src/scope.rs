//! Cancellation scopes.
//!
//! A [`Scope`] is a cloneable handle meaning "this work should stop". Scopes
//! compose in two ways:
//! - [`Scope::child`]: canceled with its parent, or on its own
//! - [`Scope::merge`]: canceled when either of two independent parents is, or on its own
//!
//! Canceling a derived scope never cancels the scopes it was derived from.
//! Each scope is backed by a set of `tokio_util` cancellation tokens: its own
//! plus every token it inherited, so observing a merged scope needs no
//! background task.

use futures_util::future::select_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Reason recorded when a scope is canceled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CancelCause {
    /// Canceled without a specific reason.
    #[error("scope canceled")]
    Canceled,

    /// Canceled with a caller-supplied reason.
    #[error("{0}")]
    Reason(String),
}

/// Global cancellation order, so derived scopes can tell which inherited
/// cancellation came first.
static CANCEL_SEQ: AtomicU64 = AtomicU64::new(0);

/// Token plus the cause it was canceled with.
#[derive(Debug)]
struct Signal {
    token: CancellationToken,
    /// Cancellation sequence number and cause.
    cause: OnceLock<(u64, CancelCause)>,
}

impl Signal {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            token: CancellationToken::new(),
            cause: OnceLock::new(),
        })
    }

    fn cancel(&self, cause: CancelCause) {
        // First cause wins; record it before the token flips.
        self.cause
            .get_or_init(|| (CANCEL_SEQ.fetch_add(1, Ordering::SeqCst), cause));
        self.token.cancel();
    }

    fn cancellation(&self) -> Option<&(u64, CancelCause)> {
        if !self.token.is_cancelled() {
            return None;
        }
        self.cause.get()
    }
}

/// Cancellation scope.
///
/// # Example
///
/// ```
/// use msgstream_core::Scope;
///
/// let connection = Scope::new();
/// let request = Scope::new();
/// let merged = Scope::merge(&connection, &request);
///
/// request.cancel();
/// assert!(merged.is_canceled());
/// assert!(!connection.is_canceled());
/// ```
#[derive(Debug, Clone)]
pub struct Scope {
    /// `signals[0]` belongs to this scope; the rest are inherited.
    signals: Arc<[Arc<Signal>]>,
}

impl Scope {
    /// Create a root scope.
    pub fn new() -> Self {
        Self {
            signals: Arc::from(vec![Signal::new()]),
        }
    }

    /// Create a scope canceled together with `self`, or on its own.
    pub fn child(&self) -> Self {
        Self::derive(&[self])
    }

    /// Create a scope canceled as soon as either `first` or `second` is.
    pub fn merge(first: &Scope, second: &Scope) -> Self {
        Self::derive(&[first, second])
    }

    fn derive(parents: &[&Scope]) -> Self {
        let mut signals = vec![Signal::new()];
        for parent in parents {
            for signal in parent.signals.iter() {
                if !signals.iter().any(|s| Arc::ptr_eq(s, signal)) {
                    signals.push(Arc::clone(signal));
                }
            }
        }
        Self {
            signals: Arc::from(signals),
        }
    }

    /// Cancel this scope (and every scope derived from it).
    pub fn cancel(&self) {
        self.cancel_with(CancelCause::Canceled);
    }

    /// Cancel this scope with a specific cause.
    ///
    /// Has no effect on the recorded cause if the scope was already canceled.
    pub fn cancel_with(&self, cause: CancelCause) {
        self.signals[0].cancel(cause);
    }

    /// Whether this scope or any scope it derives from is canceled.
    pub fn is_canceled(&self) -> bool {
        self.signals.iter().any(|s| s.token.is_cancelled())
    }

    /// Cause of cancellation, or `None` while the scope is live.
    ///
    /// When several scopes in the chain were canceled, this is the cause of
    /// the earliest cancellation. Later cancellations never replace it.
    pub fn cause(&self) -> Option<CancelCause> {
        self.signals
            .iter()
            .filter_map(|s| s.cancellation())
            .min_by_key(|(seq, _)| *seq)
            .map(|(_, cause)| cause.clone())
    }

    /// Wait until this scope is canceled.
    ///
    /// Cancel safe: dropping the future has no side effects.
    pub async fn canceled(&self) {
        let waits = self
            .signals
            .iter()
            .map(|s| Box::pin(s.token.clone().cancelled_owned()));
        select_all(waits).await;
    }
}

impl Default for Scope {
    fn default() -> Self {
        Self::new()
    }
}
