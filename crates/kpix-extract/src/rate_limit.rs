//! Per-platform token bucket rate limiting for outbound requests.
//!
//! Each platform gets its own bucket tuned to how aggressively that platform
//! blocks scrapers. Buckets refill continuously; callers either take a token
//! immediately or wait until one accrues.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use kpix_core::Platform;
use tokio::sync::Mutex;
use tracing::debug;

/// Continuous-refill token bucket.
///
/// `rate` tokens accrue per `per` seconds, capped at `burst`. Consuming takes
/// one whole token.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    per_secs: f64,
    burst: f64,
    tokens: f64,
    refreshed_at: Instant,
}

impl TokenBucket {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn new(rate: u32, per_secs: u64, burst: u32) -> Self {
        Self {
            rate: f64::from(rate),
            per_secs: per_secs as f64,
            burst: f64::from(burst),
            tokens: f64::from(burst),
            refreshed_at: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.refreshed_at).as_secs_f64();
        self.tokens = self
            .burst
            .min(self.tokens + elapsed * (self.rate / self.per_secs));
        self.refreshed_at = now;
    }

    /// Takes a token if one is available right now.
    pub fn try_consume(&mut self) -> bool {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// How long until a full token accrues. Zero when one is already there.
    pub fn time_until_available(&mut self) -> Duration {
        self.refill(Instant::now());
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) * (self.per_secs / self.rate))
        }
    }
}

/// Requests allowed per window and burst headroom for one platform.
#[derive(Debug, Clone, Copy)]
pub struct LimitSettings {
    pub rate: u32,
    pub per_secs: u64,
    pub burst: u32,
}

/// Conservative per-platform limits. Instagram blocks hardest; YouTube's
/// official quota is generous.
#[must_use]
pub fn default_limit(platform: Platform) -> LimitSettings {
    let (rate, per_secs, burst) = match platform {
        Platform::Facebook | Platform::Tiktok => (10, 60, 3),
        Platform::Instagram => (6, 60, 2),
        Platform::Twitter => (15, 900, 5),
        Platform::Youtube => (60, 3600, 10),
        Platform::Linkedin => (20, 60, 5),
    };
    LimitSettings {
        rate,
        per_secs,
        burst,
    }
}

/// One token bucket per platform, shared across the orchestrator.
pub struct PlatformLimiters {
    buckets: Mutex<HashMap<Platform, TokenBucket>>,
}

impl Default for PlatformLimiters {
    fn default() -> Self {
        Self::new()
    }
}

impl PlatformLimiters {
    #[must_use]
    pub fn new() -> Self {
        let buckets = Platform::ALL
            .iter()
            .map(|&platform| {
                let limit = default_limit(platform);
                (
                    platform,
                    TokenBucket::new(limit.rate, limit.per_secs, limit.burst),
                )
            })
            .collect();
        Self {
            buckets: Mutex::new(buckets),
        }
    }

    /// Waits until the platform's bucket yields a token.
    pub async fn acquire(&self, platform: Platform) {
        loop {
            let wait = {
                let mut buckets = self.buckets.lock().await;
                let bucket = buckets
                    .entry(platform)
                    .or_insert_with(|| TokenBucket::new(30, 60, 10));
                if bucket.try_consume() {
                    return;
                }
                bucket.time_until_available()
            };
            debug!(%platform, wait_secs = wait.as_secs_f64(), "rate limited, waiting");
            tokio::time::sleep(wait).await;
        }
    }

    /// Takes a token without waiting. Returns `false` when the bucket is dry.
    pub async fn try_acquire(&self, platform: Platform) -> bool {
        let mut buckets = self.buckets.lock().await;
        buckets
            .entry(platform)
            .or_insert_with(|| TokenBucket::new(30, 60, 10))
            .try_consume()
    }
}
