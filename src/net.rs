//! Backoff schedules shared by the rate-limit retry loop and the job poller.

use crate::constants::retry;
use std::time::Duration;

/// Which retry loop is asking for a delay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackoffKind {
    /// Wait after the `attempt`-th request was rate limited
    RateLimit,
    /// Wait before the `attempt`-th job status query
    Poll,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Backoff {
    rate_limit_initial: Duration,
    rate_limit_max: Duration,
    poll_initial: Duration,
    poll_factor: f64,
    poll_max: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            rate_limit_initial: retry::RATE_LIMIT_INITIAL_DELAY,
            rate_limit_max: retry::RATE_LIMIT_MAX_DELAY,
            poll_initial: retry::POLL_INITIAL_DELAY,
            poll_factor: retry::POLL_BACKOFF_FACTOR,
            poll_max: retry::POLL_MAX_DELAY,
        }
    }
}

impl Backoff {
    pub fn with_rate_limit(mut self, initial: Duration, max: Duration) -> Self {
        self.rate_limit_initial = initial;
        self.rate_limit_max = max.max(initial);
        self
    }

    /// Poll schedule; a `factor` below 1.0 or not finite means constant waits
    pub fn with_poll(mut self, initial: Duration, factor: f64, max: Duration) -> Self {
        self.poll_initial = initial;
        self.poll_factor = if factor.is_finite() && factor >= 1.0 {
            factor
        } else {
            log::warn!("[net] invalid poll backoff factor {factor}, using 1.0");
            1.0
        };
        self.poll_max = max.max(initial);
        self
    }

    pub fn poll_factor(&self) -> f64 {
        self.poll_factor
    }

    /// Delay for a 1-based `attempt`
    ///
    /// Rate limit: 2s, 4s, 8s, ... capped. Poll: 0 (first poll is
    /// immediate), then 2s, 3s, 4.5s, ... capped.
    pub fn next_delay(&self, attempt: u32, kind: BackoffKind) -> Duration {
        let attempt = attempt.max(1);
        match kind {
            BackoffKind::RateLimit => {
                // 2^31 already exceeds any sane cap
                let factor = 1u32 << (attempt - 1).min(31);
                self.rate_limit_initial
                    .saturating_mul(factor)
                    .min(self.rate_limit_max)
            }
            BackoffKind::Poll => {
                if attempt == 1 {
                    return Duration::ZERO;
                }
                let mut delay = self.poll_initial.min(self.poll_max);
                for _ in 2..attempt {
                    if delay >= self.poll_max {
                        break;
                    }
                    delay = delay.mul_f64(self.poll_factor).min(self.poll_max);
                }
                delay
            }
        }
    }
}
