//! Request throttle and retry policy

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Fixed client-side throttle: pause before every request that follows a
/// full burst.
///
/// Every request counts, whether or not it succeeds.
#[derive(Debug)]
pub struct RequestThrottle {
    burst: u64,
    pause: Duration,
    issued: AtomicU64,
}

impl RequestThrottle {
    /// Four requests, then one second.
    pub const DEFAULT_BURST: u64 = 4;
    pub const DEFAULT_PAUSE: Duration = Duration::from_secs(1);

    pub fn new(burst: u64, pause: Duration) -> Self {
        Self {
            burst: burst.max(1),
            pause,
            issued: AtomicU64::new(0),
        }
    }

    /// Wait if this request starts a new burst, then count it.
    pub async fn acquire(&self) {
        let issued = self.issued.fetch_add(1, Ordering::SeqCst);
        if issued > 0 && issued % self.burst == 0 {
            debug!(pause_ms = self.pause.as_millis() as u64, "Rate limiting");
            tokio::time::sleep(self.pause).await;
        }
    }

    /// Requests counted so far
    pub fn issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }
}

impl Default for RequestThrottle {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BURST, Self::DEFAULT_PAUSE)
    }
}

/// What the paging loop does after a failed page: wait `cooldown`, then
/// retry the same continuation state, up to an optional number of
/// consecutive failures.
///
/// Replaying a page is safe because every downstream write is a merge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub cooldown: Duration,
    /// `None` retries forever
    pub max_consecutive_failures: Option<u32>,
}

impl RetryPolicy {
    pub const DEFAULT_COOLDOWN: Duration = Duration::from_secs(60);

    pub fn unbounded(cooldown: Duration) -> Self {
        Self {
            cooldown,
            max_consecutive_failures: None,
        }
    }

    pub fn bounded(cooldown: Duration, max_consecutive_failures: u32) -> Self {
        Self {
            cooldown,
            max_consecutive_failures: Some(max_consecutive_failures),
        }
    }

    /// Whether to try again after `failures` consecutive failures.
    pub fn should_retry(&self, failures: u32) -> bool {
        self.max_consecutive_failures
            .map_or(true, |max| failures < max)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::unbounded(Self::DEFAULT_COOLDOWN)
    }
}
