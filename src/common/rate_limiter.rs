//! Request pacing
//!
//! Spaces requests at least `1 / requests_per_second` apart. Callers reserve
//! the next free slot under a lock and sleep outside of it, so concurrent
//! callers queue up in order without holding the lock while waiting.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};

#[derive(Debug)]
pub struct RateLimiter {
    spacing: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// `requests_per_second == 0` disables pacing
    pub fn new(requests_per_second: u32) -> Self {
        let spacing = if requests_per_second == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / requests_per_second as f64)
        };
        Self {
            spacing,
            next_slot: Mutex::new(None),
        }
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    /// Wait until the caller may send its request
    pub async fn acquire(&self) {
        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = match *next {
                Some(at) if at > now => at,
                _ => now,
            };
            *next = Some(slot + self.spacing);
            slot
        };
        sleep_until(slot).await;
    }
}
