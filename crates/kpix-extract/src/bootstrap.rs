//! Wires the extraction stack together from an [`AppConfig`].

use std::collections::HashMap;
use std::sync::Arc;

use kpix_browser::{BrowserPool, BrowserPoolConfig, HumanSimulation, PageInteraction};
use kpix_cache::{CacheConfig, CacheManager};
use kpix_core::{AppConfig, Platform, ProxySelector};
use tracing::info;

use crate::api::ApiTier;
use crate::error::ExtractError;
use crate::extractor::{Extractor, PlatformExtractor};
use crate::hybrid::{HybridOrchestrator, OrchestratorConfig};
use crate::rate_limit::PlatformLimiters;
use crate::retry::RetryPolicy;
use crate::scrape::ScrapeTier;

/// The fully wired extraction stack plus the handles needed for shutdown.
pub struct ExtractionService {
    orchestrator: Arc<HybridOrchestrator>,
    pool: Arc<BrowserPool>,
}

impl ExtractionService {
    /// Builds the cache, browser pool, per-platform clients, and the
    /// orchestrator from one config.
    ///
    /// # Errors
    /// Returns [`ExtractError::Http`] when an API client's HTTP stack cannot
    /// be constructed.
    pub fn from_config(config: &AppConfig) -> Result<Self, ExtractError> {
        let cache = Arc::new(CacheManager::new(CacheConfig::from_app_config(config)));

        let mut pool_config = BrowserPoolConfig::from_app_config(config);
        let proxies = ProxySelector::new(config.proxy_list.clone(), config.proxy_rotation);
        pool_config.proxy = proxies.next_proxy().map(str::to_owned);
        let pool = Arc::new(BrowserPool::new(pool_config));

        let interaction: Arc<dyn PageInteraction> =
            Arc::new(HumanSimulation::new(config.human_simulation_level));
        let scrape = Arc::new(ScrapeTier::new(Arc::clone(&pool), interaction));

        let mut extractors: HashMap<Platform, Arc<dyn Extractor>> = HashMap::new();
        for platform in Platform::ALL {
            let api = ApiTier::from_config(platform, config)?;
            extractors.insert(
                platform,
                Arc::new(PlatformExtractor::new(platform, api, Arc::clone(&scrape))),
            );
        }

        let orchestrator = Arc::new(HybridOrchestrator::new(
            extractors,
            cache,
            Arc::new(PlatformLimiters::new()),
            RetryPolicy::new(config.max_retries),
            OrchestratorConfig {
                parallel: config.parallel_extraction,
                inter_platform_delay_ms: config.inter_platform_delay_ms,
                extraction_timeout_secs: config.extraction_timeout_secs,
            },
        ));

        info!(
            env = %config.env,
            parallel = config.parallel_extraction,
            cache_backend = ?config.cache_backend,
            "extraction stack ready"
        );
        Ok(Self { orchestrator, pool })
    }

    #[must_use]
    pub fn orchestrator(&self) -> Arc<HybridOrchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Closes all pooled browsers. Call during graceful shutdown.
    pub async fn shutdown(&self) {
        self.pool.close_all().await;
    }
}
