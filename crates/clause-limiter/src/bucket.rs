//! Token bucket: capacity = 2*QPS, refill rate = QPS tokens/sec (§4.1).

use std::time::{Duration, Instant};

pub struct TokenBucket {
    capacity: f32,
    refill_per_sec: f32,
    tokens: f32,
    last_refill: Instant,
}

impl TokenBucket {
    pub fn new(qps: f32) -> Self {
        Self {
            capacity: qps * 2.0,
            refill_per_sec: qps,
            tokens: qps * 2.0,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f32();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token if available. On failure, returns how long the caller
    /// should wait before the next token is expected.
    pub fn try_take(&mut self) -> Result<(), Duration> {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            let deficit = 1.0 - self.tokens;
            let wait_secs = deficit / self.refill_per_sec.max(f32::EPSILON);
            Err(Duration::from_secs_f32(wait_secs.max(0.01)))
        }
    }
}
