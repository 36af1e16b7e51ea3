//! Composite rate limiter enforcing several windows at once.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, trace};

use super::cancel::Cancellation;
use super::window::Window;
use crate::error::{MultirateError, Result};

/// Outcome of a non-blocking [`RateLimiter::try_acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// A permit was taken from every window
    Allowed,
    /// Nothing was taken; try again after `retry_after`
    Denied { retry_after: Duration },
}

impl Decision {
    /// Whether the permit was granted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    /// Suggested back-off. Zero when allowed.
    pub fn retry_after(&self) -> Duration {
        match self {
            Decision::Allowed => Duration::ZERO,
            Decision::Denied { retry_after } => *retry_after,
        }
    }
}

/// Point-in-time view of one window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowStatus {
    /// Window name
    pub name: String,
    /// Maximum permits per interval
    pub capacity: u32,
    /// Permits taken in the current interval
    pub used: u32,
    /// Permits still available in the current interval
    pub remaining: u32,
    /// Time until the current interval ends
    pub reset_after: Duration,
}

/// Where a paced caller stands after visiting its window.
enum Pacing {
    /// A slot was reserved; wait this long for it
    Reserved(Duration),
    /// The window is full; wait this long for it to reset
    Saturated(Duration),
}

/// Rate limiter that grants a permit only when every window has room.
///
/// All windows sit behind one lock so a permit is taken from every window or
/// from none. The lock is never held while a caller sleeps.
///
/// ```no_run
/// # async fn run() -> multirate::error::Result<()> {
/// use multirate::ratelimit::{Cancellation, RateLimiter, Window};
///
/// let limiter = RateLimiter::new([
///     ("burst", Window::per_second(10)),
///     ("sustained", Window::per_minute(100)),
/// ])?;
///
/// limiter.wait(&Cancellation::new()).await?;
/// # Ok(())
/// # }
/// ```
pub struct RateLimiter {
    /// Windows indexed by name
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    /// Create a limiter over a fixed set of named windows.
    ///
    /// Fails with [`MultirateError::EmptyWindowSet`] if `windows` is empty.
    pub fn new<I, K>(windows: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, Window)>,
        K: Into<String>,
    {
        let windows: HashMap<String, Window> = windows
            .into_iter()
            .map(|(name, window)| (name.into(), window))
            .collect();

        if windows.is_empty() {
            return Err(MultirateError::EmptyWindowSet);
        }

        info!(windows = windows.len(), "Rate limiter initialized");

        Ok(Self {
            windows: Mutex::new(windows),
        })
    }

    /// Take a permit from every window if all of them have room.
    ///
    /// Windows that are due are reset along the way, but no count changes
    /// unless every window has room.
    fn try_consume_all(windows: &mut HashMap<String, Window>, now: Instant) -> bool {
        for window in windows.values_mut() {
            if !window.check_and_reset(now) {
                return false;
            }
        }

        for window in windows.values_mut() {
            window.consume();
        }
        true
    }

    /// Time until every window has room again.
    fn min_wait_time(windows: &HashMap<String, Window>, now: Instant) -> Duration {
        windows
            .values()
            .map(|window| window.remaining_time(now))
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Take a permit without waiting.
    ///
    /// An allowed decision has already consumed the permit.
    pub fn try_acquire(&self) -> Decision {
        let mut windows = self.windows.lock();
        let now = Instant::now();

        if Self::try_consume_all(&mut windows, now) {
            trace!("Permit granted");
            return Decision::Allowed;
        }

        let retry_after = Self::min_wait_time(&windows, now);
        trace!(retry_after = ?retry_after, "Permit denied");
        Decision::Denied { retry_after }
    }

    /// Wait until a permit can be taken from every window.
    ///
    /// Waiters are not queued: after each sleep the caller competes again with
    /// everyone else, so a later caller may be served first. Returns
    /// [`MultirateError::Cancelled`] or [`MultirateError::DeadlineExceeded`]
    /// if `cancel` fires first, in which case no permit was taken.
    pub async fn wait(&self, cancel: &Cancellation) -> Result<()> {
        cancel.check()?;

        loop {
            let wait_time = {
                let mut windows = self.windows.lock();
                let now = Instant::now();

                if Self::try_consume_all(&mut windows, now) {
                    trace!("Permit granted");
                    return Ok(());
                }
                Self::min_wait_time(&windows, now)
            };

            debug!(wait = ?wait_time, "Waiting for windows to reset");
            cancel.sleep(wait_time).await?;
        }
    }

    /// Wait for the next evenly paced permit of the window called `name`.
    ///
    /// Permits are handed out at `interval / capacity` steps from the start of
    /// the window's interval, one slot per caller in arrival order. Only the
    /// named window is consulted and charged.
    ///
    /// The slot is reserved before sleeping. A caller cancelled while waiting
    /// for its slot does not give it back, so the window has one permit less
    /// for the rest of its interval.
    pub async fn wait_evenly(&self, cancel: &Cancellation, name: &str) -> Result<()> {
        loop {
            let pacing = {
                let mut windows = self.windows.lock();
                let window = windows
                    .get_mut(name)
                    .ok_or_else(|| MultirateError::UnknownWindow(name.to_string()))?;
                cancel.check()?;

                let now = Instant::now();
                window.reset_if_due(now);

                if window.has_capacity() {
                    let delay = window.next_slot_delay(now);
                    window.consume();
                    Pacing::Reserved(delay)
                } else {
                    Pacing::Saturated(window.time_until_reset(now))
                }
            };

            match pacing {
                Pacing::Reserved(wait_time) if wait_time.is_zero() => {
                    trace!(window = name, "Paced permit granted");
                    return Ok(());
                }
                Pacing::Reserved(wait_time) => {
                    trace!(window = name, wait = ?wait_time, "Paced slot reserved");
                    return cancel.sleep(wait_time).await;
                }
                Pacing::Saturated(wait_time) => {
                    debug!(window = name, wait = ?wait_time, "Window saturated, waiting for reset");
                    cancel.sleep(wait_time).await?;
                }
            }
        }
    }

    /// Names of all windows, sorted.
    pub fn window_names(&self) -> Vec<String> {
        let windows = self.windows.lock();
        let mut names: Vec<String> = windows.keys().cloned().collect();
        names.sort();
        names
    }

    /// Current usage of every window, sorted by name.
    ///
    /// A window whose interval has run out is reported as empty, but is not
    /// actually reset until the next acquisition touches it.
    pub fn status(&self) -> Vec<WindowStatus> {
        let windows = self.windows.lock();
        let now = Instant::now();

        let mut status: Vec<WindowStatus> = windows
            .iter()
            .map(|(name, window)| {
                let (used, reset_after) = window.observe(now);
                WindowStatus {
                    name: name.clone(),
                    capacity: window.capacity(),
                    used,
                    remaining: window.capacity().saturating_sub(used),
                    reset_after,
                }
            })
            .collect();
        status.sort_by(|a, b| a.name.cmp(&b.name));
        status
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("windows", &self.window_names())
            .finish()
    }
}
