//! Retry policy for the execute pipeline.

use std::time::Duration;

/// How many times a request is attempted and how long to wait in between.
///
/// Every failed attempt is retried: transport failures as well as responses
/// carrying a 4xx or 5xx status. A `retry_count` of zero still performs one
/// attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Configured number of attempts.
    pub retry_count: u32,
    /// Delay applied before each retry.
    pub backoff: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retry_count: 1,
            backoff: BackoffStrategy::None,
        }
    }
}

impl RetryPolicy {
    /// A single attempt, no retries.
    pub fn once() -> Self {
        Self::default()
    }

    /// Retry up to `retry_count` attempts with a fixed sleep between them.
    pub fn fixed(retry_count: u32, delay: Duration) -> Self {
        let backoff = if delay.is_zero() {
            BackoffStrategy::None
        } else {
            BackoffStrategy::Constant(delay)
        };
        Self {
            retry_count,
            backoff,
        }
    }

    /// Retry without sleeping.
    pub fn immediate(retry_count: u32) -> Self {
        Self {
            retry_count,
            backoff: BackoffStrategy::None,
        }
    }

    /// Retry with a delay that doubles on every retry, capped at `max`.
    pub fn exponential(retry_count: u32, initial: Duration, max: Duration) -> Self {
        Self {
            retry_count,
            backoff: BackoffStrategy::Exponential { initial, max },
        }
    }

    /// Effective number of attempts; never less than one.
    pub fn attempts(&self) -> u32 {
        self.retry_count.max(1)
    }

    /// Delay before retry number `retry` (1-based).
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        self.backoff.delay_for_retry(retry)
    }
}

/// Sleep strategy between attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Retry immediately.
    None,
    /// Same delay before every retry.
    Constant(Duration),
    /// Delay grows by `step` with every retry.
    Linear {
        /// Delay increment per retry.
        step: Duration,
        /// Maximum delay.
        max: Duration,
    },
    /// Delay doubles with every retry.
    Exponential {
        /// Delay before the first retry.
        initial: Duration,
        /// Maximum delay.
        max: Duration,
    },
}

impl BackoffStrategy {
    /// Delay before retry number `retry` (1-based).
    pub fn delay_for_retry(&self, retry: u32) -> Duration {
        let retry = retry.max(1);
        match self {
            Self::None => Duration::ZERO,
            Self::Constant(delay) => *delay,
            Self::Linear { step, max } => step.saturating_mul(retry).min(*max),
            Self::Exponential { initial, max } => {
                let factor = 2u32.checked_pow(retry - 1).unwrap_or(u32::MAX);
                initial.saturating_mul(factor).min(*max)
            }
        }
    }
}
