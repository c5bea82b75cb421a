//! Hybrid orchestrator: cache check, API attempt, scrape attempt with retry,
//! estimate fallback, result assembly.
//!
//! Extraction never returns an error to the caller. Every tier failure is
//! logged and converted into an absent field; a target where every tier
//! failed yields a `ProfileKpi` with `extraction_success = false`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use kpix_cache::{cache_key, CacheManager};
use kpix_core::{
    engagement_rate, EngagementMetrics, ExtractionMethod, Platform, ProfileKpi,
};
use rand::Rng;
use serde_json::json;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::descriptor::descriptor;
use crate::extractor::Extractor;
use crate::rate_limit::PlatformLimiters;
use crate::retry::RetryPolicy;

/// Orchestration knobs lifted out of the app config.
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Fan out across platforms concurrently, or walk them sequentially with
    /// randomized delay to avoid correlated-request fingerprints.
    pub parallel: bool,
    /// Upper bound for the randomized delay between platforms in sequential
    /// mode.
    pub inter_platform_delay_ms: u64,
    /// Hard cap on one platform/target extraction, human pacing included.
    pub extraction_timeout_secs: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            parallel: true,
            inter_platform_delay_ms: 3000,
            extraction_timeout_secs: 300,
        }
    }
}

/// Drives the tiered extraction flow across all registered platforms.
pub struct HybridOrchestrator {
    extractors: HashMap<Platform, Arc<dyn Extractor>>,
    cache: Arc<CacheManager>,
    limiters: Arc<PlatformLimiters>,
    retry: RetryPolicy,
    config: OrchestratorConfig,
    // per-key single-flight locks so concurrent requests for the same
    // uncached target issue one upstream call
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl HybridOrchestrator {
    #[must_use]
    pub fn new(
        extractors: HashMap<Platform, Arc<dyn Extractor>>,
        cache: Arc<CacheManager>,
        limiters: Arc<PlatformLimiters>,
        retry: RetryPolicy,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            extractors,
            cache,
            limiters,
            retry,
            config,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    async fn flight_lock(&self, key: &str) -> Arc<Mutex<()>> {
        let mut inflight = self.inflight.lock().await;
        Arc::clone(
            inflight
                .entry(key.to_owned())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    /// Drops the map entry once no other caller holds the lock, so the map
    /// does not grow with every distinct target ever requested.
    async fn release_flight(&self, key: &str, lock: &Arc<Mutex<()>>) {
        let mut inflight = self.inflight.lock().await;
        // two strong refs means the map entry and ours; waiters hold more
        if Arc::strong_count(lock) == 2 {
            inflight.remove(key);
        }
    }

    /// Extract everything for one platform/target pair. Infallible; failures
    /// are folded into the snapshot.
    pub async fn extract(&self, platform: Platform, target: &str) -> ProfileKpi {
        let timeout = Duration::from_secs(self.config.extraction_timeout_secs);
        match tokio::time::timeout(timeout, self.extract_inner(platform, target)).await {
            Ok(kpi) => kpi,
            Err(_) => {
                warn!(%platform, target, timeout_secs = timeout.as_secs(), "extraction timed out");
                ProfileKpi::failed(
                    platform,
                    target,
                    format!(
                        "extraction timed out after {}s",
                        self.config.extraction_timeout_secs
                    ),
                )
            }
        }
    }

    async fn extract_inner(&self, platform: Platform, target: &str) -> ProfileKpi {
        let Some(extractor) = self.extractors.get(&platform) else {
            return ProfileKpi::failed(platform, target, "no extractor registered");
        };

        let flight_key = format!("{platform}:{target}");
        let lock = self.flight_lock(&flight_key).await;
        let guard = lock.lock().await;

        let (followers, followers_method) = self.followers(extractor.as_ref(), target).await;
        let engagement = self
            .engagement(extractor.as_ref(), target, followers)
            .await;

        drop(guard);
        self.release_flight(&flight_key, &lock).await;

        Self::assemble(platform, target, followers, followers_method, engagement)
    }

    /// Followers via cache, then API, then scrape with retry. Never estimated.
    async fn followers(
        &self,
        extractor: &dyn Extractor,
        target: &str,
    ) -> (Option<u64>, Option<ExtractionMethod>) {
        let platform = extractor.platform();
        let key = cache_key(platform, "followers", target);

        if let Some(count) = self.cache.get(&key).await.and_then(|v| v.as_u64()) {
            return (Some(count), None);
        }

        // transient API errors (429s, connection drops) are retried with
        // backoff before the tier is given up on
        let api = self
            .retry
            .run(|| async {
                self.limiters.acquire(platform).await;
                extractor.api_followers(target).await
            })
            .await;
        match api {
            Ok(count) => {
                info!(%platform, target, count, "followers via API");
                self.cache.set(&key, &json!(count)).await;
                return (Some(count), Some(ExtractionMethod::Api));
            }
            Err(err) => {
                debug!(%platform, target, error = %err, "API tier failed, falling back to scrape");
            }
        }

        let scraped = self
            .retry
            .run(|| async {
                self.limiters.acquire(platform).await;
                extractor.scrape_followers(target).await
            })
            .await;
        match scraped {
            Ok(count) => {
                info!(%platform, target, count, "followers via scrape");
                self.cache.set(&key, &json!(count)).await;
                (Some(count), Some(ExtractionMethod::Scrape))
            }
            Err(err) => {
                warn!(%platform, target, error = %err, "follower extraction failed on every tier");
                (None, None)
            }
        }
    }

    /// Engagement via cache, API, scrape, then estimation from the follower
    /// count as a last resort.
    async fn engagement(
        &self,
        extractor: &dyn Extractor,
        target: &str,
        followers: Option<u64>,
    ) -> Option<EngagementMetrics> {
        let platform = extractor.platform();
        let key = cache_key(platform, "engagement", target);

        if let Some(value) = self.cache.get(&key).await {
            match serde_json::from_value::<EngagementMetrics>(value) {
                Ok(metrics) => return Some(metrics),
                Err(err) => {
                    debug!(%platform, target, error = %err, "stale engagement cache entry, dropping");
                    self.cache.delete(&key).await;
                }
            }
        }

        let api = self
            .retry
            .run(|| async {
                self.limiters.acquire(platform).await;
                extractor.api_engagement(target).await
            })
            .await;
        match api {
            Ok(metrics) => {
                info!(%platform, target, "engagement via API");
                self.store_engagement(&key, &metrics).await;
                return Some(metrics);
            }
            Err(err) => {
                debug!(%platform, target, error = %err, "API engagement failed, falling back to scrape");
            }
        }

        let scraped = self
            .retry
            .run(|| async {
                self.limiters.acquire(platform).await;
                extractor.scrape_engagement(target).await
            })
            .await;
        match scraped {
            Ok(metrics) => {
                info!(%platform, target, "engagement via scrape");
                self.store_engagement(&key, &metrics).await;
                return Some(metrics);
            }
            Err(err) => {
                debug!(%platform, target, error = %err, "scrape engagement failed");
            }
        }

        // estimation needs a measured follower count; followers are never
        // themselves estimated
        let followers = followers?;
        let metrics = extractor.estimate_engagement(followers);
        info!(%platform, target, "engagement estimated from follower count");
        self.store_engagement(&key, &metrics).await;
        Some(metrics)
    }

    async fn store_engagement(&self, key: &str, metrics: &EngagementMetrics) {
        match serde_json::to_value(metrics) {
            Ok(value) => self.cache.set(key, &value).await,
            Err(err) => warn!(key, error = %err, "engagement metrics not serializable"),
        }
    }

    fn assemble(
        platform: Platform,
        target: &str,
        followers: Option<u64>,
        followers_method: Option<ExtractionMethod>,
        engagement: Option<EngagementMetrics>,
    ) -> ProfileKpi {
        let total = engagement.as_ref().and_then(EngagementMetrics::total);
        let rate = match (total, followers) {
            (Some(total), Some(followers)) => engagement_rate(total, followers),
            _ => None,
        };
        let success = followers.is_some() || engagement.is_some();
        let method = followers_method.or(engagement.as_ref().map(|e| e.method));

        let handle = descriptor(platform).handle(target);
        ProfileKpi {
            platform,
            target: target.to_owned(),
            username: if handle.is_empty() { None } else { Some(handle) },
            followers_count: followers,
            following_count: None,
            posts_count: engagement.as_ref().and_then(|e| e.posts_count),
            verified: None,
            avg_likes: engagement.as_ref().and_then(|e| e.avg_likes),
            avg_comments: engagement.as_ref().and_then(|e| e.avg_comments),
            avg_shares: engagement.as_ref().and_then(|e| e.avg_shares),
            avg_views: engagement.as_ref().and_then(|e| e.avg_views),
            total_engagement: total,
            engagement_rate: rate,
            estimated: engagement.as_ref().is_some_and(|e| e.estimated),
            extraction_timestamp: Utc::now(),
            extraction_method: method,
            extraction_success: success,
            error_message: if success {
                None
            } else {
                Some("all extraction tiers failed".to_owned())
            },
        }
    }

    /// Fan out over several platform/target pairs. Parallel mode runs them
    /// concurrently; sequential mode spaces platforms out with a randomized
    /// delay.
    pub async fn extract_all(
        &self,
        requests: &HashMap<Platform, String>,
    ) -> HashMap<Platform, ProfileKpi> {
        if self.config.parallel {
            let futures = requests
                .iter()
                .map(|(&platform, target)| async move {
                    (platform, self.extract(platform, target).await)
                });
            return futures::future::join_all(futures).await.into_iter().collect();
        }

        let mut results = HashMap::new();
        let mut first = true;
        for (&platform, target) in requests {
            if !first && self.config.inter_platform_delay_ms > 0 {
                let delay_ms = rand::rng().random_range(0..self.config.inter_platform_delay_ms);
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
            first = false;
            results.insert(platform, self.extract(platform, target).await);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Configurable fake for driving the orchestrator without a network or
    /// browser.
    struct MockExtractor {
        platform: Platform,
        api_followers: Option<u64>,
        scrape_followers: Option<u64>,
        scrape_engagement: Option<EngagementMetrics>,
        api_calls: Arc<AtomicU32>,
        call_delay_ms: u64,
        // first N api_followers calls fail with a 30s rate-limit hint
        api_transient_failures: u32,
    }

    impl MockExtractor {
        fn new(platform: Platform) -> Self {
            Self {
                platform,
                api_followers: None,
                scrape_followers: None,
                scrape_engagement: None,
                api_calls: Arc::new(AtomicU32::new(0)),
                call_delay_ms: 0,
                api_transient_failures: 0,
            }
        }

        fn soft_fail(&self) -> ExtractError {
            ExtractError::MarkupMismatch {
                platform: self.platform,
                target: "test".to_owned(),
            }
        }
    }

    #[async_trait]
    impl Extractor for MockExtractor {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn api_followers(&self, _target: &str) -> Result<u64, ExtractError> {
            let call = self.api_calls.fetch_add(1, Ordering::SeqCst);
            if self.call_delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.call_delay_ms)).await;
            }
            if call < self.api_transient_failures {
                return Err(ExtractError::RateLimited {
                    platform: self.platform,
                    retry_after_secs: 30,
                });
            }
            self.api_followers.ok_or_else(|| self.soft_fail())
        }

        async fn api_engagement(&self, _target: &str) -> Result<EngagementMetrics, ExtractError> {
            Err(ExtractError::Unsupported {
                platform: self.platform,
            })
        }

        async fn scrape_followers(&self, _target: &str) -> Result<u64, ExtractError> {
            self.scrape_followers.ok_or_else(|| self.soft_fail())
        }

        async fn scrape_engagement(
            &self,
            _target: &str,
        ) -> Result<EngagementMetrics, ExtractError> {
            self.scrape_engagement.clone().ok_or_else(|| self.soft_fail())
        }

        fn estimate_engagement(&self, followers: u64) -> EngagementMetrics {
            crate::estimate::estimate_engagement(descriptor(self.platform), followers)
        }
    }

    fn orchestrator_with(extractor: MockExtractor) -> (HybridOrchestrator, Arc<CacheManager>) {
        let cache = Arc::new(CacheManager::memory_only(3600));
        let mut extractors: HashMap<Platform, Arc<dyn Extractor>> = HashMap::new();
        let platform = extractor.platform;
        extractors.insert(platform, Arc::new(extractor));
        let orchestrator = HybridOrchestrator::new(
            extractors,
            Arc::clone(&cache),
            Arc::new(PlatformLimiters::new()),
            RetryPolicy::new(0),
            OrchestratorConfig::default(),
        );
        (orchestrator, cache)
    }

    #[tokio::test]
    async fn api_success_is_cached_under_followers_key() {
        let mut mock = MockExtractor::new(Platform::Youtube);
        mock.api_followers = Some(30_300);
        let (orchestrator, cache) = orchestrator_with(mock);

        let target = "https://www.youtube.com/@MrBeast";
        let kpi = orchestrator.extract(Platform::Youtube, target).await;

        assert_eq!(kpi.followers_count, Some(30_300));
        assert_eq!(kpi.extraction_method, Some(ExtractionMethod::Api));
        assert!(kpi.extraction_success);

        let cached = cache
            .get(&format!("youtube:followers:{target}"))
            .await
            .expect("follower count should be cached");
        assert_eq!(cached, json!(30_300));
    }

    #[tokio::test]
    async fn api_failure_falls_through_to_scrape() {
        let mut mock = MockExtractor::new(Platform::Instagram);
        mock.scrape_followers = Some(500);
        let (orchestrator, _cache) = orchestrator_with(mock);

        let kpi = orchestrator.extract(Platform::Instagram, "nike").await;

        assert_eq!(kpi.followers_count, Some(500));
        assert_eq!(kpi.extraction_method, Some(ExtractionMethod::Scrape));
    }

    #[tokio::test]
    async fn engagement_estimated_when_scrape_fails() {
        let mut mock = MockExtractor::new(Platform::Tiktok);
        mock.scrape_followers = Some(1_000_000);
        let (orchestrator, _cache) = orchestrator_with(mock);

        let kpi = orchestrator.extract(Platform::Tiktok, "charlidamelio").await;

        assert_eq!(kpi.followers_count, Some(1_000_000));
        // tiktok assumes a 10% engagement rate
        assert_eq!(kpi.total_engagement, Some(100_000));
        assert!(kpi.estimated);
        assert_eq!(kpi.engagement_rate, Some(10.0));
    }

    #[tokio::test]
    async fn total_failure_yields_failed_snapshot_and_no_cache_entry() {
        let mock = MockExtractor::new(Platform::Facebook);
        let (orchestrator, cache) = orchestrator_with(mock);

        let kpi = orchestrator.extract(Platform::Facebook, "meta").await;

        assert!(!kpi.extraction_success);
        assert!(kpi.followers_count.is_none());
        assert!(kpi.error_message.is_some());
        assert!(cache.get("facebook:followers:meta").await.is_none());
    }

    #[tokio::test]
    async fn engagement_rate_derived_from_measured_fields() {
        let mut mock = MockExtractor::new(Platform::Instagram);
        mock.scrape_followers = Some(1000);
        mock.scrape_engagement = Some(EngagementMetrics {
            avg_likes: Some(40),
            avg_comments: Some(10),
            avg_shares: None,
            avg_views: None,
            posts_count: Some(100),
            total_engagement: Some(50),
            estimated: false,
            method: ExtractionMethod::Scrape,
        });
        let (orchestrator, _cache) = orchestrator_with(mock);

        let kpi = orchestrator.extract(Platform::Instagram, "natgeo").await;

        assert_eq!(kpi.engagement_rate, Some(5.0));
        assert!(!kpi.estimated);
    }

    #[tokio::test]
    async fn concurrent_requests_for_one_target_share_a_flight() {
        let mut mock = MockExtractor::new(Platform::Youtube);
        mock.api_followers = Some(42);
        mock.call_delay_ms = 50;
        let api_calls = Arc::clone(&mock.api_calls);
        let (orchestrator, _cache) = orchestrator_with(mock);
        let orchestrator = Arc::new(orchestrator);

        let a = {
            let o = Arc::clone(&orchestrator);
            tokio::spawn(async move { o.extract(Platform::Youtube, "@MrBeast").await })
        };
        let b = {
            let o = Arc::clone(&orchestrator);
            tokio::spawn(async move { o.extract(Platform::Youtube, "@MrBeast").await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());

        assert_eq!(a.followers_count, Some(42));
        assert_eq!(b.followers_count, Some(42));
        // the second flight re-checked the cache under the key lock and
        // never reached the API
        assert_eq!(api_calls.load(Ordering::SeqCst), 1);
        assert!(orchestrator.inflight.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn transient_api_error_is_retried_and_retry_after_honored() {
        let mut mock = MockExtractor::new(Platform::Youtube);
        mock.api_followers = Some(42);
        mock.api_transient_failures = 1;
        let api_calls = Arc::clone(&mock.api_calls);
        let cache = Arc::new(CacheManager::memory_only(3600));
        let mut extractors: HashMap<Platform, Arc<dyn Extractor>> = HashMap::new();
        extractors.insert(Platform::Youtube, Arc::new(mock));
        let orchestrator = HybridOrchestrator::new(
            extractors,
            cache,
            Arc::new(PlatformLimiters::new()),
            RetryPolicy::new(1),
            OrchestratorConfig::default(),
        );

        let start = tokio::time::Instant::now();
        let kpi = orchestrator.extract(Platform::Youtube, "@MrBeast").await;

        assert_eq!(kpi.followers_count, Some(42));
        assert_eq!(kpi.extraction_method, Some(ExtractionMethod::Api));
        assert_eq!(api_calls.load(Ordering::SeqCst), 2);
        // the 429's retry-after hint outweighs the exponential delay
        assert!(start.elapsed() >= Duration::from_secs(30));
    }

    #[tokio::test]
    async fn flight_locks_are_dropped_after_extraction() {
        let mut mock = MockExtractor::new(Platform::Instagram);
        mock.scrape_followers = Some(500);
        let (orchestrator, _cache) = orchestrator_with(mock);

        orchestrator.extract(Platform::Instagram, "nike").await;
        orchestrator.extract(Platform::Instagram, "natgeo").await;

        assert!(orchestrator.inflight.lock().await.is_empty());
    }

    #[tokio::test]
    async fn extract_all_returns_one_result_per_platform() {
        let cache = Arc::new(CacheManager::memory_only(3600));
        let mut extractors: HashMap<Platform, Arc<dyn Extractor>> = HashMap::new();
        let mut yt = MockExtractor::new(Platform::Youtube);
        yt.api_followers = Some(1);
        let mut ig = MockExtractor::new(Platform::Instagram);
        ig.scrape_followers = Some(2);
        extractors.insert(Platform::Youtube, Arc::new(yt));
        extractors.insert(Platform::Instagram, Arc::new(ig));
        let orchestrator = HybridOrchestrator::new(
            extractors,
            cache,
            Arc::new(PlatformLimiters::new()),
            RetryPolicy::new(0),
            OrchestratorConfig::default(),
        );

        let mut requests = HashMap::new();
        requests.insert(Platform::Youtube, "@a".to_owned());
        requests.insert(Platform::Instagram, "b".to_owned());

        let results = orchestrator.extract_all(&requests).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[&Platform::Youtube].followers_count, Some(1));
        assert_eq!(results[&Platform::Instagram].followers_count, Some(2));
    }
}
