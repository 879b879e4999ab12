//! Origin admission pacing.
//!
//! Throttles how fast resources enter the transfer queue, so origin request
//! pressure stays at or below a configured ceiling independent of worker
//! count.

use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Token bucket with capacity one: successive acquisitions are spaced at
/// least `1/rate` seconds apart.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    refill_rate: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(refill_rate: f64) -> Self {
        Self {
            tokens: 1.0,
            refill_rate,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(1.0);
        self.last_refill = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_next_token(&self) -> Duration {
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            let seconds = (1.0 - self.tokens) / self.refill_rate;
            Duration::from_secs_f64(seconds.max(0.0))
        }
    }
}

/// Pacer for the admission producer. A rate of 0 means unlimited.
pub struct AdmissionPacer {
    bucket: Option<Mutex<TokenBucket>>,
}

impl AdmissionPacer {
    pub fn new(rate: f64) -> Self {
        Self {
            bucket: (rate > 0.0).then(|| Mutex::new(TokenBucket::new(rate))),
        }
    }

    /// Wait until the next admission is allowed.
    pub async fn acquire(&self) {
        let Some(bucket) = &self.bucket else {
            return;
        };
        loop {
            let wait = {
                let mut bucket = bucket.lock().await;
                if bucket.try_acquire() {
                    return;
                }
                bucket.time_until_next_token()
            };
            if wait > Duration::ZERO {
                tokio::time::sleep(wait).await;
            }
        }
    }
}
