use async_trait::async_trait;
use config_manager::{RateLimitConfig, RateLimitStrategy, MAX_RATE_LIMIT_DELAY_MS};
use governor::{
    clock::DefaultClock,
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep_until, Instant};
use tracing::debug;

/// Gate placed in front of every call to an external provider.
///
/// Implementations are shared by all callers of one provider, so the quota
/// holds no matter how many wallets are in flight.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Wait until the next call is allowed
    async fn acquire(&self);

    /// Provider name used in log lines
    fn label(&self) -> &str;
}

/// Keeps at least `delay` between the starts of two consecutive calls.
///
/// Waiters are served one at a time in arrival order. The delay is capped
/// at `MAX_RATE_LIMIT_DELAY_MS`.
pub struct FixedDelayLimiter {
    label: String,
    delay: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl FixedDelayLimiter {
    pub fn new(label: impl Into<String>, delay: Duration) -> Self {
        Self {
            label: label.into(),
            delay: delay.min(Duration::from_millis(MAX_RATE_LIMIT_DELAY_MS)),
            next_slot: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

#[async_trait]
impl RateLimiter for FixedDelayLimiter {
    async fn acquire(&self) {
        let mut next_slot = self.next_slot.lock().await;

        if let Some(slot) = *next_slot {
            if slot > Instant::now() {
                debug!(
                    "⏳ {} rate limit: waiting {}ms",
                    self.label,
                    slot.saturating_duration_since(Instant::now()).as_millis()
                );
                sleep_until(slot).await;
            }
        }

        *next_slot = Some(Instant::now() + self.delay);
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// Token bucket (GCRA) limiter for running several wallets at once against
/// a per-second quota.
pub struct TokenBucketLimiter {
    label: String,
    limiter: GovernorLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>,
}

impl TokenBucketLimiter {
    pub fn new(label: impl Into<String>, requests_per_second: u32, burst: u32) -> Self {
        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(rate).allow_burst(burst);

        Self {
            label: label.into(),
            limiter: GovernorLimiter::direct(quota),
        }
    }
}

#[async_trait]
impl RateLimiter for TokenBucketLimiter {
    async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    fn label(&self) -> &str {
        &self.label
    }
}

/// No throttling at all. Meant for fakes and local mirrors.
pub struct Unthrottled {
    label: String,
}

impl Unthrottled {
    pub fn new(label: impl Into<String>) -> Self {
        Self { label: label.into() }
    }
}

#[async_trait]
impl RateLimiter for Unthrottled {
    async fn acquire(&self) {}

    fn label(&self) -> &str {
        &self.label
    }
}

/// Build the limiter a provider's configuration asks for
pub fn build_limiter(label: &str, config: &RateLimitConfig) -> Arc<dyn RateLimiter> {
    match config.strategy {
        RateLimitStrategy::FixedDelay => Arc::new(FixedDelayLimiter::new(
            label,
            Duration::from_millis(config.delay_ms),
        )),
        RateLimitStrategy::TokenBucket => Arc::new(TokenBucketLimiter::new(
            label,
            config.requests_per_second,
            config.burst,
        )),
    }
}
