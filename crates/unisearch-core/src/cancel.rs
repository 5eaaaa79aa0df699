//! Cancellation for in-flight backend searches.
//!
//! A `CancellationToken` is handed to every backend adapter together with a
//! timeout. Adapters poll it while waiting on a child process or a native
//! engine call and abandon the work once it is set.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cancellation token for cooperative cancellation of searches.
///
/// This token can be cloned and shared across threads. When `cancel()` is
/// called on any clone, all clones observe the cancellation.
///
/// # Example
///
/// ```
/// use unisearch_core::cancel::CancellationToken;
///
/// let token = CancellationToken::new();
/// let token_clone = token.clone();
///
/// token_clone.cancel();
/// assert!(token.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a new cancellation token.
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Check cancellation and return an error if cancelled.
    pub fn check(&self) -> Result<(), CancelledError> {
        if self.is_cancelled() {
            Err(CancelledError)
        } else {
            Ok(())
        }
    }
}

/// Error returned when an operation is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CancelledError;

impl std::fmt::Display for CancelledError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Operation was cancelled")
    }
}

impl std::error::Error for CancelledError {}

impl From<CancelledError> for crate::error::SearchError {
    fn from(_: CancelledError) -> Self {
        crate::error::SearchError::Cancelled
    }
}

/// Time and cancellation budget for one backend call.
#[derive(Debug, Clone)]
pub struct SearchContext {
    timeout: Duration,
    started: Instant,
    cancel: CancellationToken,
}

impl SearchContext {
    /// Start a budget of `timeout` observed through `cancel`.
    pub fn new(timeout: Duration, cancel: CancellationToken) -> Self {
        Self {
            timeout,
            started: Instant::now(),
            cancel,
        }
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The token adapters poll.
    pub fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.timeout.saturating_sub(self.started.elapsed())
    }

    /// True once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.started.elapsed() >= self.timeout
    }
}
