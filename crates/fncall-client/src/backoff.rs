use fncall_common::protocol::{ErrorClassification, FailureCause};
use std::time::Duration;

/// Delay between attempts, chosen by failure cause.
///
/// | cause            | delay after attempt `n` (1-indexed)          |
/// |------------------|----------------------------------------------|
/// | rate limited     | `Retry-After` if sent, else `rate_limit_default` (5s) |
/// | server error     | `exponential_base * 2^n` (2s, 4s, 8s, ...)    |
/// | network error    | same as server error                          |
/// | timeout          | `timeout_delay` (1s)                          |
///
/// Non-retryable classifications get no delay at all; the invoker raises them
/// instead. `max_delay` only caps the exponential schedule, never a delay the
/// server asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Wait after a 429 that carried no `Retry-After`
    ///
    /// Default: 5s
    pub rate_limit_default: Duration,
    /// Wait after a timed-out attempt
    ///
    /// Default: 1s
    pub timeout_delay: Duration,
    /// Unit of the exponential schedule
    ///
    /// Default: 1s
    pub exponential_base: Duration,
    /// Optional cap on the exponential schedule
    ///
    /// Default: uncapped, bounded in practice by `max_retries`
    pub max_delay: Option<Duration>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            rate_limit_default: Duration::from_secs(5),
            timeout_delay: Duration::from_secs(1),
            exponential_base: Duration::from_secs(1),
            max_delay: None,
        }
    }
}

impl BackoffPolicy {
    /// Returns how long to wait before the attempt after `attempt`.
    ///
    /// # Arguments
    /// * `classification` - Classification of the attempt that just failed
    /// * `attempt` - 1-indexed number of that attempt
    ///
    /// # Returns
    /// `None` when the failure must not be retried
    pub fn delay_for(&self, classification: &ErrorClassification, attempt: u32) -> Option<Duration> {
        if !classification.retryable {
            return None;
        }

        match classification.cause {
            FailureCause::RateLimited { retry_after } => {
                Some(retry_after.unwrap_or(self.rate_limit_default))
            }
            FailureCause::Server { .. } | FailureCause::Network => Some(self.exponential(attempt)),
            FailureCause::Timeout => Some(self.timeout_delay),
            FailureCause::Client { .. }
            | FailureCause::MalformedBody
            | FailureCause::Auth
            | FailureCause::Cancelled => None,
        }
    }

    /// `exponential_base * 2^attempt`, saturating, capped by `max_delay`.
    pub fn exponential(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let delay = self.exponential_base.saturating_mul(factor);
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}
