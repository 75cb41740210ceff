use std::time::Duration;

use crate::config::RetryConfig;

/// Exponential backoff: `initial`, `2 * initial`, `4 * initial`, ...
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Delay before the next attempt, given how many attempts already failed.
    /// `None` once the retry budget is spent.
    pub fn backoff(&self, failed_attempts: u32) -> Option<Duration> {
        if failed_attempts == 0 || failed_attempts > self.max_retries {
            return None;
        }
        let factor = 2_u32.checked_pow(failed_attempts - 1)?;
        self.initial_backoff.checked_mul(factor)
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(cfg: &RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            initial_backoff: cfg.initial_backoff,
        }
    }
}
