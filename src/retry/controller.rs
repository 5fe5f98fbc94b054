//! Retry loop around a fallible async operation
//!
//! The loop performs no I/O of its own besides waiting, and the waiting goes
//! through [`Backoff`] so tests can record delays instead of sleeping.

use crate::retry::policy::{classify, FailReason, RetryDecision, RetryPolicy, Stage};
use crate::{Result, ScrapeError};
use async_trait::async_trait;
use std::future::Future;
use std::time::Duration;

/// A failure tagged with the pipeline stage it came from
#[derive(Debug)]
pub struct StageError {
    pub stage: Stage,
    pub error: ScrapeError,
}

impl StageError {
    pub fn new(stage: Stage, error: ScrapeError) -> Self {
        Self { stage, error }
    }
}

/// Waiting capability used between attempts
#[async_trait]
pub trait Backoff: Send + Sync {
    async fn wait(&self, delay: Duration);
}

/// Sleeps on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioBackoff;

#[async_trait]
impl Backoff for TokioBackoff {
    async fn wait(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Announced before each backoff wait
#[derive(Debug, Clone)]
pub struct RetryNotice {
    /// The attempt that just failed
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryNotice {
    pub fn message(&self) -> String {
        format!(
            "Connection issue, retrying in {}s (attempt {} of {})",
            self.delay.as_secs(),
            self.attempt + 1,
            self.max_attempts
        )
    }
}

/// Optional listener for retry notices
pub type RetryListener<'a> = &'a (dyn Fn(&RetryNotice) + Send + Sync);

/// Runs `operation` until it succeeds or the policy gives up
///
/// The operation receives the 1-indexed attempt number.
///
/// # Errors
///
/// * Terminal and (by default) throttled failures are returned unchanged
///   after the first attempt that produced them
/// * Retryable failures that outlast `max_attempts` become
///   [`ScrapeError::ExhaustedRetries`] with a user-facing message
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    backoff: &dyn Backoff,
    mut operation: F,
    on_retry: Option<RetryListener<'_>>,
) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = std::result::Result<T, StageError>>,
{
    let mut attempt = 1;
    loop {
        let StageError { stage, error } = match operation(attempt).await {
            Ok(value) => return Ok(value),
            Err(failure) => failure,
        };

        match policy.decide(classify(&error), stage, attempt) {
            RetryDecision::Retry(delay) => {
                tracing::warn!(
                    "Attempt {}/{} failed during {:?}: {}; retrying in {:?}",
                    attempt,
                    policy.max_attempts,
                    stage,
                    error,
                    delay
                );
                if let Some(listener) = on_retry {
                    listener(&RetryNotice {
                        attempt,
                        max_attempts: policy.max_attempts,
                        delay,
                    });
                }
                backoff.wait(delay).await;
                attempt += 1;
            }
            RetryDecision::Fail(FailReason::Terminal) => {
                tracing::error!("Not retrying {:?} failure: {}", stage, error);
                return Err(error);
            }
            RetryDecision::Fail(FailReason::Throttled) => {
                tracing::error!("Throttled by the site during {:?}: {}", stage, error);
                return Err(error);
            }
            RetryDecision::Fail(FailReason::Exhausted) => {
                tracing::error!("Giving up after {} attempts: {}", attempt, error);
                return Err(exhausted(error, attempt));
            }
        }
    }
}

fn exhausted(error: ScrapeError, attempts: u32) -> ScrapeError {
    let noun = if attempts == 1 { "attempt" } else { "attempts" };
    ScrapeError::ExhaustedRetries {
        attempts,
        message: format!(
            "Still failing after {} {}. {}",
            attempts,
            noun,
            error.user_message()
        ),
        source: Box::new(error),
    }
}
