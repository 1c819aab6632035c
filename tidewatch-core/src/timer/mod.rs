//! Millisecond timers for the polling loop
//!
//! All times are `u32` milliseconds of monotonic uptime. The counter wraps
//! after ~49.7 days, so every comparison goes through [`reached`].

pub mod backoff;
pub mod deadline;
pub mod retry;

pub use backoff::{Backoff, BACKOFF_INITIAL_MS, BACKOFF_MAX_MS};
pub use deadline::{reached, Deadline};
pub use retry::{PendingRetry, RetryScheduler};
