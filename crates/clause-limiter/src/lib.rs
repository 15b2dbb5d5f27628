//! Token-bucket rate limiting with a per-domain circuit breaker (§4.1).
//!
//! Every outbound crawl request goes through one global bucket and one
//! per-domain bucket; both must grant a token, global first, so a newly
//! discovered domain can never exceed the system-wide budget. A domain
//! whose breaker is open fails fast without touching either bucket.

mod bucket;
mod breaker;
mod domain;

pub use breaker::{BreakerState, CircuitBreaker};
pub use bucket::TokenBucket;
pub use domain::registered_domain;

use dashmap::DashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub enum LimiterError {
    /// The domain's breaker is open; non-retryable at this layer (§4.1).
    CircuitOpen { domain: String, retry_after: Duration },
    /// The caller's future was dropped/cancelled while waiting for a token.
    Cancelled,
}

impl std::fmt::Display for LimiterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LimiterError::CircuitOpen { domain, retry_after } => write!(
                f,
                "circuit open for domain {domain}, retry after {:.0}s",
                retry_after.as_secs_f32()
            ),
            LimiterError::Cancelled => write!(f, "rate limiter acquire was cancelled"),
        }
    }
}

impl std::error::Error for LimiterError {}

pub struct LimiterConfig {
    pub global_qps: f32,
    pub per_domain_qps: f32,
    pub circuit_breaker_enabled: bool,
    pub circuit_breaker_cooldown: Duration,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            global_qps: 0.8,
            per_domain_qps: 0.8,
            circuit_breaker_enabled: true,
            circuit_breaker_cooldown: Duration::from_secs(300),
        }
    }
}

struct DomainState {
    bucket: Mutex<TokenBucket>,
    breaker: Mutex<CircuitBreaker>,
}

/// Gates outbound requests with a global bucket and per-domain buckets plus
/// breakers, keyed by registered domain (§9: per-key locking, not a global lock).
pub struct RateLimiter {
    config: LimiterConfig,
    global: Mutex<TokenBucket>,
    // Guards FIFO ordering of acquires against the global bucket (§5: tokens
    // are granted in arrival order).
    global_queue: tokio::sync::Mutex<()>,
    domains: DashMap<String, DomainState>,
}

impl RateLimiter {
    pub fn new(config: LimiterConfig) -> Self {
        let global = TokenBucket::new(config.global_qps);
        Self {
            config,
            global: Mutex::new(global),
            global_queue: tokio::sync::Mutex::new(()),
            domains: DashMap::new(),
        }
    }

    fn domain_entry(&self, domain: &str) -> dashmap::mapref::one::Ref<'_, String, DomainState> {
        if !self.domains.contains_key(domain) {
            self.domains.entry(domain.to_string()).or_insert_with(|| DomainState {
                bucket: Mutex::new(TokenBucket::new(self.config.per_domain_qps)),
                breaker: Mutex::new(CircuitBreaker::new(self.config.circuit_breaker_cooldown)),
            });
        }
        self.domains.get(domain).expect("just inserted")
    }

    /// Blocks until a token is available under both buckets, or fails fast
    /// if the domain's breaker is open.
    pub async fn acquire(&self, url: &str) -> Result<(), LimiterError> {
        let domain = registered_domain(url);
        self.check_breaker(&domain)?;

        // Global first (§4.1: bound system-wide load even for new domains),
        // serialized so grants stay FIFO across concurrent callers.
        let _queue_guard = self.global_queue.lock().await;
        loop {
            let wait = {
                let mut bucket = self.global.lock().expect("global bucket poisoned");
                bucket.try_take()
            };
            match wait {
                Ok(()) => break,
                Err(delay) => tokio::time::sleep(delay).await,
            }
        }
        drop(_queue_guard);

        loop {
            self.check_breaker(&domain)?;
            let wait = {
                let entry = self.domain_entry(&domain);
                let mut bucket = entry.bucket.lock().expect("domain bucket poisoned");
                bucket.try_take()
            };
            match wait {
                Ok(()) => return Ok(()),
                Err(delay) => tokio::time::sleep(delay).await,
            }
        }
    }

    /// Non-blocking variant: succeeds only if a token is immediately available.
    pub fn try_acquire(&self, url: &str) -> Result<(), LimiterError> {
        let domain = registered_domain(url);
        self.check_breaker(&domain)?;

        {
            let mut bucket = self.global.lock().expect("global bucket poisoned");
            if bucket.try_take().is_err() {
                return Err(LimiterError::Cancelled);
            }
        }

        let entry = self.domain_entry(&domain);
        let mut bucket = entry.bucket.lock().expect("domain bucket poisoned");
        bucket.try_take().map_err(|_| LimiterError::Cancelled)
    }

    pub fn record_success(&self, url: &str) {
        let domain = registered_domain(url);
        let entry = self.domain_entry(&domain);
        let mut breaker = entry.breaker.lock().expect("breaker poisoned");
        breaker.record_success();
    }

    pub fn record_failure(&self, url: &str, status_code: u16) {
        if !self.config.circuit_breaker_enabled {
            return;
        }
        let domain = registered_domain(url);
        let entry = self.domain_entry(&domain);
        let mut breaker = entry.breaker.lock().expect("breaker poisoned");
        breaker.record_failure(status_code);
    }

    fn check_breaker(&self, domain: &str) -> Result<(), LimiterError> {
        if !self.config.circuit_breaker_enabled {
            return Ok(());
        }
        let entry = self.domain_entry(domain);
        let mut breaker = entry.breaker.lock().expect("breaker poisoned");
        if let Some(retry_after) = breaker.reject_if_open(Instant::now()) {
            return Err(LimiterError::CircuitOpen {
                domain: domain.to_string(),
                retry_after,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn acquire_blocks_until_token_refills() {
        let limiter = RateLimiter::new(LimiterConfig {
            global_qps: 10.0,
            per_domain_qps: 10.0,
            circuit_breaker_enabled: true,
            circuit_breaker_cooldown: Duration::from_secs(1),
        });
        for _ in 0..20 {
            limiter.acquire("https://example.com/a").await.unwrap();
        }
    }

    #[tokio::test]
    async fn breaker_opens_after_429_and_blocks_acquire() {
        let limiter = RateLimiter::new(LimiterConfig::default());
        limiter.record_failure("https://insurer.example.cn/a", 429);

        let result = limiter.acquire("https://insurer.example.cn/b").await;
        assert!(matches!(result, Err(LimiterError::CircuitOpen { .. })));
    }

    #[tokio::test]
    async fn record_success_resets_failure_counter() {
        let limiter = RateLimiter::new(LimiterConfig::default());
        limiter.record_failure("https://insurer.example.cn/a", 500);
        limiter.record_failure("https://insurer.example.cn/a", 500);
        limiter.record_success("https://insurer.example.cn/a");
        limiter.record_failure("https://insurer.example.cn/a", 500);

        // only one consecutive failure since the reset; breaker needs >= 3
        assert!(limiter.try_acquire("https://insurer.example.cn/a").is_ok());
    }

    #[tokio::test]
    async fn three_consecutive_failures_trip_breaker_without_4xx() {
        let limiter = RateLimiter::new(LimiterConfig::default());
        for _ in 0..3 {
            limiter.record_failure("https://insurer.example.cn/a", 500);
        }
        let result = limiter.acquire("https://insurer.example.cn/a").await;
        assert!(matches!(result, Err(LimiterError::CircuitOpen { .. })));
    }
}
