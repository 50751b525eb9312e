//! Bounded polling for pages without completion signals
//!
//! The balance widget recomputes asynchronously and never announces when it is
//! done, so readiness is detected by re-reading state until a predicate holds.
//! All timing goes through `tokio::time`, which lets tests drive the loop with a
//! paused clock instead of real sleeps.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// Maximum duration and re-check interval for a poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub timeout: Duration,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }
}

/// Result of a bounded poll: the last observed value and whether the predicate accepted it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Polled<T> {
    pub value: T,
    pub satisfied: bool,
}

/// Observe repeatedly until `done` accepts a value or the policy times out
///
/// Always observes at least once. On timeout the last observation is returned
/// with `satisfied == false`.
pub async fn poll_until<T, F, Fut, P>(policy: PollPolicy, mut observe: F, mut done: P) -> Polled<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = T>,
    P: FnMut(&T) -> bool,
{
    let deadline = Instant::now() + policy.timeout;

    loop {
        let value = observe().await;
        if done(&value) {
            return Polled {
                value,
                satisfied: true,
            };
        }

        if Instant::now() + policy.interval > deadline {
            return Polled {
                value,
                satisfied: false,
            };
        }

        tokio::time::sleep(policy.interval).await;
    }
}
