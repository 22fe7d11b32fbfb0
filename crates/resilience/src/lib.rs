//! Retry with backoff for fallible async operations
//!
//! # Example
//!
//! ```rust
//! use bedtime_resilience::RetryPolicy;
//! use std::time::Duration;
//!
//! // Three attempts, one second apart
//! let policy = RetryPolicy::fixed(3, Duration::from_secs(1));
//! assert_eq!(policy.delay_for_attempt(2), Duration::from_secs(1));
//! ```

mod error;
mod retry;

pub use error::{ResilienceError, ResilienceResult};
pub use retry::{retry, RetryPolicy};
