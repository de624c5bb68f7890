//! Request pacing for embedding providers.
//!
//! [`RateLimiter`] enforces a fixed minimum interval between the *starts* of
//! consecutive embedding requests, independently of how many workers are
//! issuing them. Ingestion concurrency decides how many calls may be in
//! flight; the limiter decides how fast new ones may begin.

use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;

/// Fixed-interval rate limiter shared by all embedding workers.
#[derive(Debug)]
pub struct RateLimiter {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// Allow one request per `interval`.
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next_slot: Mutex::new(None),
        }
    }

    /// A limiter that never waits.
    pub fn unlimited() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Allow at most `requests` request starts per second.
    pub fn per_second(requests: u32) -> Self {
        if requests == 0 {
            return Self::unlimited();
        }
        Self::new(Duration::from_secs(1) / requests)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wait until the caller may start its request.
    ///
    /// Waiters are served in FIFO order; each acquired slot pushes the next
    /// one `interval` further out.
    pub async fn acquire(&self) {
        if self.interval.is_zero() {
            return;
        }
        let mut next_slot = self.next_slot.lock().await;
        let now = Instant::now();
        let slot = match *next_slot {
            Some(at) if at > now => {
                tokio::time::sleep_until(at).await;
                at
            }
            _ => now,
        };
        *next_slot = Some(slot + self.interval);
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::unlimited()
    }
}
