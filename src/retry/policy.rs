//! Failure classification and backoff decisions
//!
//! Pure functions only: the decision for a failure depends on its class, the
//! pipeline stage it came from and the attempt number.

use crate::config::RetryConfig;
use crate::{HttpStatusError, ScrapeError};
use std::time::Duration;

/// How a failure is treated at the retry boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Bad credentials, unexpected markup, 4xx other than 429; never retried
    Terminal,
    /// Resets, timeouts and other socket interruptions
    Transient,
    /// HTTP 429 and 503
    Throttled,
}

/// Pipeline stage a failure came from; selects the backoff unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Login,
    Pagination,
}

/// Why the controller stopped retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailReason {
    Terminal,
    Throttled,
    Exhausted,
}

/// Outcome of one policy decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    Retry(Duration),
    Fail(FailReason),
}

/// Classifies a failure for the retry boundary
pub fn classify(error: &ScrapeError) -> FailureClass {
    match error {
        ScrapeError::Transport(_) => FailureClass::Transient,
        ScrapeError::HttpStatus(HttpStatusError::RateLimited { .. })
        | ScrapeError::HttpStatus(HttpStatusError::ServiceUnavailable { .. }) => {
            FailureClass::Throttled
        }
        ScrapeError::HttpStatus(HttpStatusError::Other { status, .. }) if *status >= 500 => {
            FailureClass::Transient
        }
        ScrapeError::ExhaustedRetries { source, .. } => classify(source),
        _ => FailureClass::Terminal,
    }
}

/// Retry limits and backoff units
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub login_base_delay: Duration,
    pub pagination_base_delay: Duration,
    pub retry_throttled: bool,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            login_base_delay: Duration::from_millis(config.login_base_delay_ms),
            pagination_base_delay: Duration::from_millis(config.pagination_base_delay_ms),
            retry_throttled: config.retry_throttled,
        }
    }

    /// A single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            login_base_delay: Duration::ZERO,
            pagination_base_delay: Duration::ZERO,
            retry_throttled: false,
        }
    }

    pub fn base_delay(&self, stage: Stage) -> Duration {
        match stage {
            Stage::Login => self.login_base_delay,
            Stage::Pagination => self.pagination_base_delay,
        }
    }

    /// Linear backoff: `attempt × base`, attempt being 1-indexed
    pub fn delay_for_attempt(&self, stage: Stage, attempt: u32) -> Duration {
        self.base_delay(stage).saturating_mul(attempt)
    }

    /// Decides what to do after `attempt` failed with a failure of `class`
    pub fn decide(&self, class: FailureClass, stage: Stage, attempt: u32) -> RetryDecision {
        match class {
            FailureClass::Terminal => return RetryDecision::Fail(FailReason::Terminal),
            FailureClass::Throttled if !self.retry_throttled => {
                return RetryDecision::Fail(FailReason::Throttled)
            }
            _ => {}
        }

        if attempt >= self.max_attempts {
            return RetryDecision::Fail(FailReason::Exhausted);
        }

        RetryDecision::Retry(self.delay_for_attempt(stage, attempt))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
