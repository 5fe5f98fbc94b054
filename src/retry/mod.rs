//! Retry controller
//!
//! Splits retry handling into a pure policy (classification and backoff
//! decisions) and a small async loop that applies it to an operation.

mod controller;
mod policy;

pub use controller::{
    run_with_retry, Backoff, RetryListener, RetryNotice, StageError, TokioBackoff,
};
pub use policy::{classify, FailReason, FailureClass, RetryDecision, RetryPolicy, Stage};
