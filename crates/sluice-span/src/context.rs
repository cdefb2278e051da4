//! Deadline and cancellation carried through every database call.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::{Result, SpanError};

/// Caller-supplied deadline and cancellation signal.
///
/// Clones share the cancellation flag, so a clone handed to another thread
/// can cancel an in-flight migration run.
#[derive(Debug, Clone, Default)]
pub struct Context {
    deadline: Option<Instant>,
    cancelled: Arc<AtomicBool>,
}

impl Context {
    /// A context that never expires.
    pub fn background() -> Self {
        Self::default()
    }

    /// A context that expires `timeout` from now.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// A context that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Signals cancellation to every clone of this context.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline, `None` if there is no deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| deadline.saturating_duration_since(Instant::now()))
    }

    /// Fails if the context has been cancelled or its deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            return Err(SpanError::Cancelled);
        }

        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(SpanError::DeadlineExceeded),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_context_never_fails() {
        let ctx = Context::background();
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining().is_none());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let ctx = Context::background();
        let clone = ctx.clone();

        clone.cancel();

        assert!(ctx.is_cancelled());
        assert!(matches!(ctx.check(), Err(SpanError::Cancelled)));
    }

    #[test]
    fn test_expired_deadline_fails_check() {
        let ctx = Context::with_deadline(Instant::now());
        assert!(matches!(ctx.check(), Err(SpanError::DeadlineExceeded)));
        assert_eq!(ctx.remaining(), Some(Duration::ZERO));
    }

    #[test]
    fn test_future_deadline_passes_check() {
        let ctx = Context::with_timeout(Duration::from_secs(60));
        assert!(ctx.check().is_ok());
        assert!(ctx.remaining().unwrap() > Duration::from_secs(30));
    }
}
