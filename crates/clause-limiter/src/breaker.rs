//! Per-domain circuit breaker: Closed <-> Open <-> HalfOpen (§4.1, §4's state machines).

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

pub struct CircuitBreaker {
    state: BreakerState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            state: BreakerState::Closed,
            consecutive_failures: 0,
            opened_at: None,
            cooldown,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    /// Returns `Some(retry_after)` if the caller should be refused without
    /// consuming a token; transitions Open -> HalfOpen once the cooldown
    /// elapses, admitting exactly the next probe.
    pub fn reject_if_open(&mut self, now: Instant) -> Option<Duration> {
        match self.state {
            BreakerState::Closed => None,
            BreakerState::HalfOpen => None,
            BreakerState::Open => {
                let opened_at = self.opened_at.expect("Open implies opened_at is set");
                let elapsed = now.duration_since(opened_at);
                if elapsed >= self.cooldown {
                    self.state = BreakerState::HalfOpen;
                    None
                } else {
                    Some(self.cooldown - elapsed)
                }
            }
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.state = BreakerState::Closed;
        self.opened_at = None;
    }

    /// On status in {403, 429} or >= 3 consecutive failures, trip to Open.
    /// A failure seen while HalfOpen re-opens with a fresh cooldown.
    pub fn record_failure(&mut self, status_code: u16) {
        self.consecutive_failures += 1;
        let hostile_status = matches!(status_code, 403 | 429);
        if hostile_status || self.consecutive_failures >= 3 || self.state == BreakerState::HalfOpen {
            self.state = BreakerState::Open;
            self.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_open_on_429() {
        let mut breaker = CircuitBreaker::new(Duration::from_secs(300));
        breaker.record_failure(429);
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn trips_open_on_three_consecutive_failures() {
        let mut breaker = CircuitBreaker::new(Duration::from_secs(300));
        breaker.record_failure(500);
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure(500);
        assert_eq!(breaker.state(), BreakerState::Closed);
        breaker.record_failure(500);
        assert_eq!(breaker.state(), BreakerState::Open);
    }

    #[test]
    fn half_open_probe_success_closes_and_resets() {
        let mut breaker = CircuitBreaker::new(Duration::from_millis(1));
        breaker.record_failure(429);
        std::thread::sleep(Duration::from_millis(5));
        assert!(breaker.reject_if_open(Instant::now()).is_none());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_success();
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_probe_failure_reopens_with_fresh_cooldown() {
        let mut breaker = CircuitBreaker::new(Duration::from_millis(1));
        breaker.record_failure(429);
        std::thread::sleep(Duration::from_millis(5));
        breaker.reject_if_open(Instant::now());
        assert_eq!(breaker.state(), BreakerState::HalfOpen);

        breaker.record_failure(500);
        assert_eq!(breaker.state(), BreakerState::Open);
    }
}
