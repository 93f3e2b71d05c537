// Global request throttle shared by every worker of a scan run

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};

/// Fixed-interval limiter: at most one request start per `delay`.
///
/// Slots are handed out in call order. The first caller also waits one full
/// interval, so a sequential scan sleeps `delay` before every request.
#[derive(Debug)]
pub struct Throttle {
    delay: Duration,
    next_slot: Mutex<Instant>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            next_slot: Mutex::new(Instant::now() + delay),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Wait for this caller's slot.
    pub async fn acquire(&self) {
        if self.delay.is_zero() {
            return;
        }

        let slot = {
            let mut next = self.next_slot.lock().await;
            let now = Instant::now();
            let slot = if *next > now { *next } else { now + self.delay };
            *next = slot + self.delay;
            slot
        };

        sleep_until(slot).await;
    }
}
