// src/pacing.rs
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::time::Duration;

/// Throttles outbound detail requests. Awaited once before every request.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn ready(&self);
}

/// Token bucket with room for a single request, refilled once per period.
///
/// The first request goes out immediately; every following one waits until
/// at least `period` has passed since the previous one.
pub struct QuotaPacer {
    limiter: DefaultDirectRateLimiter,
    period: Duration,
}

impl QuotaPacer {
    pub fn new(period: Duration) -> Result<Self> {
        let quota = Quota::with_period(period)
            .ok_or_else(|| anyhow!("pacing period must be greater than zero"))?;

        Ok(Self {
            limiter: RateLimiter::direct(quota),
            period,
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

#[async_trait]
impl Pacer for QuotaPacer {
    async fn ready(&self) {
        self.limiter.until_ready().await;
    }
}
