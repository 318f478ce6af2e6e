//! Acknowledge-then-check rate limiter
//!
//! `acknowledge` marks that the next check must enforce the cooldown;
//! `check` and `check_async` then sleep out whatever remains of the target
//! interval and reset the reference point. Unacknowledged checks, and
//! checks after the interval has already passed, return immediately.

use std::time::{Duration, Instant};

use tracing::debug;

/// Enforces a minimum delay between acknowledged operations.
#[derive(Debug)]
pub struct RateLimiter {
    target: Duration,
    res: Instant,
    acknowledged: bool,
}

impl RateLimiter {
    /// Create a limiter with the given target interval.
    pub fn new(target: Duration) -> Self {
        Self {
            target,
            res: Instant::now(),
            acknowledged: false,
        }
    }

    /// Flag the next check as needing the cooldown.
    pub fn acknowledge(&mut self) {
        self.acknowledged = true;
    }

    /// Whether the next check will consider the cooldown.
    pub fn acknowledged(&self) -> bool {
        self.acknowledged
    }

    /// Time left until the target interval has elapsed since the last reset.
    fn remaining(&self) -> Duration {
        self.target.saturating_sub(self.res.elapsed())
    }

    /// Block the thread until the cooldown has elapsed, if acknowledged.
    pub fn check(&mut self) {
        let wait = self.remaining();
        if self.acknowledged && !wait.is_zero() {
            debug!("cooldown: sleeping {}ms", wait.as_millis());
            std::thread::sleep(wait);
            self.reset();
        }
    }

    /// Suspend the task until the cooldown has elapsed, if acknowledged.
    ///
    /// The await here is the only suspension point; everything else in the
    /// limiter is synchronous.
    pub async fn check_async(&mut self) {
        let wait = self.remaining();
        if self.acknowledged && !wait.is_zero() {
            debug!("cooldown: suspending {}ms", wait.as_millis());
            tokio::time::sleep(wait).await;
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.res = Instant::now();
        self.acknowledged = false;
    }
}
