use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the delay grows between successive attempts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Backoff {
    /// Always wait the base delay.
    Fixed,
    /// Wait `base * n` after the n-th failed attempt.
    Linear,
    /// Wait `base * 2^(n-1)` after the n-th failed attempt.
    Exponential,
}

/// Describes how many times an operation is attempted and how long to wait in between.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub max_attempts: usize,
    /// Base delay between attempts.
    pub delay: Duration,
    pub backoff: Backoff,
    /// Upper bound for any single delay.
    pub max_delay: Duration,
    /// Random extra delay in `[0, jitter)` added to every wait.
    pub jitter: Duration,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Fixed,
            max_delay: delay,
            jitter: Duration::ZERO,
        }
    }

    pub fn linear(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
            backoff: Backoff::Linear,
            max_delay: Duration::from_secs(300),
            jitter: Duration::ZERO,
        }
    }

    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    pub fn attempts(&self) -> usize {
        self.max_attempts.max(1)
    }

    /// Delay to wait after the given failed attempt (1-based), before any jitter.
    pub fn delay_after(&self, failed_attempt: usize) -> Duration {
        let n = failed_attempt.max(1) as u32;
        let delay = match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Linear => self.delay.saturating_mul(n),
            Backoff::Exponential => self
                .delay
                .saturating_mul(2u32.saturating_pow(n.saturating_sub(1))),
        };
        delay.min(self.max_delay.max(self.delay))
    }

    /// Actual wait after the given failed attempt: the scheduled delay plus a random
    /// jitter in `[0, jitter)`.
    pub fn wait_after(&self, failed_attempt: usize) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rand::random::<u64>() % jitter_ms)
        };
        self.delay_after(failed_attempt).saturating_add(jitter)
    }
}
