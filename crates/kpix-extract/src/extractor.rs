//! The per-platform extractor seam.
//!
//! `Extractor` is the capability set the orchestrator drives; the single
//! generic `PlatformExtractor` implements it for every platform by combining
//! a descriptor, an API tier and the shared scrape tier. Tests swap in mock
//! implementations.

use std::sync::Arc;

use async_trait::async_trait;
use kpix_core::{EngagementMetrics, Platform};

use crate::api::ApiTier;
use crate::descriptor::{descriptor, PlatformDescriptor};
use crate::error::ExtractError;
use crate::estimate::estimate_engagement;
use crate::scrape::ScrapeTier;

/// Tiered extraction capabilities for one platform.
#[async_trait]
pub trait Extractor: Send + Sync {
    fn platform(&self) -> Platform;

    /// Follower count via the official API.
    async fn api_followers(&self, target: &str) -> Result<u64, ExtractError>;

    /// Engagement via the official API.
    async fn api_engagement(&self, target: &str) -> Result<EngagementMetrics, ExtractError>;

    /// Follower count via the browser scrape tier.
    async fn scrape_followers(&self, target: &str) -> Result<u64, ExtractError>;

    /// Engagement via the browser scrape tier.
    async fn scrape_engagement(&self, target: &str) -> Result<EngagementMetrics, ExtractError>;

    /// Engagement assumed from a follower count. Infallible, always flagged
    /// estimated.
    fn estimate_engagement(&self, followers: u64) -> EngagementMetrics;
}

/// The one concrete extractor. Platform differences live entirely in the
/// descriptor table and the API tier.
pub struct PlatformExtractor {
    descriptor: &'static PlatformDescriptor,
    api: ApiTier,
    scrape: Arc<ScrapeTier>,
}

impl PlatformExtractor {
    #[must_use]
    pub fn new(platform: Platform, api: ApiTier, scrape: Arc<ScrapeTier>) -> Self {
        Self {
            descriptor: descriptor(platform),
            api,
            scrape,
        }
    }
}

#[async_trait]
impl Extractor for PlatformExtractor {
    fn platform(&self) -> Platform {
        self.descriptor.platform
    }

    async fn api_followers(&self, target: &str) -> Result<u64, ExtractError> {
        let handle = self.descriptor.handle(target);
        self.api.followers(&handle).await
    }

    async fn api_engagement(&self, target: &str) -> Result<EngagementMetrics, ExtractError> {
        let handle = self.descriptor.handle(target);
        self.api.engagement(&handle).await
    }

    async fn scrape_followers(&self, target: &str) -> Result<u64, ExtractError> {
        self.scrape.followers(self.descriptor, target).await
    }

    async fn scrape_engagement(&self, target: &str) -> Result<EngagementMetrics, ExtractError> {
        self.scrape.engagement(self.descriptor, target).await
    }

    fn estimate_engagement(&self, followers: u64) -> EngagementMetrics {
        estimate_engagement(self.descriptor, followers)
    }
}
