//! Caller-supplied cancellation for the waiting operations.

use std::time::Duration;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{MultirateError, Result};

/// Explicit cancel signal plus an optional deadline.
///
/// Checked by [`RateLimiter::wait`](super::RateLimiter::wait) and
/// [`RateLimiter::wait_evenly`](super::RateLimiter::wait_evenly) at every
/// suspension point. Clones share the same cancel signal.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A cancellation that never fires unless [`cancel`](Self::cancel) is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. a child of a shutdown token.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Give up at `deadline`. An earlier deadline already set is kept.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(current) => current.min(deadline),
            None => deadline,
        });
        self
    }

    /// Give up `timeout` from now. A timeout too large to represent sets no deadline.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => self.with_deadline(deadline),
            None => self,
        }
    }

    /// Fire the cancel signal for every clone of this cancellation.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the cancel signal has fired.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Get the underlying cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Get the deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Fail if the token was cancelled or the deadline has passed.
    pub fn check(&self) -> Result<()> {
        if self.token.is_cancelled() {
            return Err(MultirateError::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(MultirateError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Sleep for `duration` unless cancelled or past the deadline first.
    pub async fn sleep(&self, duration: Duration) -> Result<()> {
        self.check()?;

        let deadline = async {
            match self.deadline {
                Some(deadline) => time::sleep_until(deadline).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;
            _ = self.token.cancelled() => Err(MultirateError::Cancelled),
            _ = deadline => Err(MultirateError::DeadlineExceeded),
            _ = time::sleep(duration) => Ok(()),
        }
    }
}
