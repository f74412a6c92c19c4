//! Business logic services.
//!
//! This module contains the retry policy applied to upstream calls.

pub mod retry;

pub use retry::{Backoff, RetryOutcome, RetryPolicy};
