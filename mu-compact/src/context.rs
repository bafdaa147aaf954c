//! Cancellation and deadline context passed through every compaction.

use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{CompactError, Result};

/// How many loop iterations a strategy runs between context checks.
pub const CHECK_INTERVAL: usize = 256;

/// Cooperative cancellation context.
///
/// Strategies call [`CompactContext::checkpoint`] while walking large
/// node/edge collections so a cancelled or timed-out caller stops the work
/// instead of waiting for it to finish.
#[derive(Clone, Debug, Default)]
pub struct CompactContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl CompactContext {
    /// A context that never cancels on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// A context tied to an existing cancellation token.
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Builder: fail with `DeadlineExceeded` once `timeout` has elapsed.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// The underlying token, for wiring into signal handlers.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Cancel this context and every clone of it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Return an error if the context is cancelled or past its deadline.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(CompactError::Cancelled);
        }
        if let Some(deadline) = self.deadline {
            if Instant::now() >= deadline {
                return Err(CompactError::DeadlineExceeded);
            }
        }
        Ok(())
    }

    /// Call `check` every [`CHECK_INTERVAL`] iterations.
    pub fn checkpoint(&self, iteration: usize) -> Result<()> {
        if iteration % CHECK_INTERVAL == 0 {
            self.check()
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_context_passes() {
        let ctx = CompactContext::new();
        assert!(ctx.check().is_ok());
        assert!(ctx.checkpoint(0).is_ok());
    }

    #[test]
    fn test_cancel_propagates_to_clones() {
        let ctx = CompactContext::new();
        let clone = ctx.clone();
        ctx.cancel();
        assert!(matches!(clone.check(), Err(CompactError::Cancelled)));
        // Off-interval iterations skip the check
        assert!(clone.checkpoint(1).is_ok());
        assert!(clone.checkpoint(CHECK_INTERVAL).is_err());
    }

    #[test]
    fn test_deadline_exceeded() {
        let ctx = CompactContext::new().with_timeout(Duration::ZERO);
        assert!(matches!(ctx.check(), Err(CompactError::DeadlineExceeded)));
    }
}
