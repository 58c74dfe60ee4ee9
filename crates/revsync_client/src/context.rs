//! Per-call cancellation and deadlines.

use crate::error::{ReplicationError, ReplicationResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Cancellation flag and optional deadline handed to every call.
///
/// Clones share the cancellation flag, so a clone kept by another thread can
/// cancel a walk in progress.
#[derive(Debug, Clone, Default)]
pub struct CallContext {
    cancelled: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CallContext {
    /// Creates a context with no deadline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Sets a deadline `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Returns a clone whose deadline is at most `timeout` from now.
    pub fn bounded(&self, timeout: Duration) -> Self {
        let limit = Instant::now() + timeout;
        let deadline = match self.deadline {
            Some(deadline) if deadline <= limit => deadline,
            _ => limit,
        };
        Self {
            cancelled: Arc::clone(&self.cancelled),
            deadline: Some(deadline),
        }
    }

    /// The deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Cancels this context and all of its clones.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns true if the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
    }

    /// Fails with `Cancelled` or `Timeout` if the call must stop.
    pub fn check(&self) -> ReplicationResult<()> {
        if self.is_cancelled() {
            return Err(ReplicationError::Cancelled);
        }
        if self.is_expired() {
            return Err(ReplicationError::Timeout);
        }
        Ok(())
    }
}
