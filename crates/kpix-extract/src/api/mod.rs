//! Official-API tier, one client per platform that has a usable API.
//!
//! LinkedIn and TikTok have no viable public statistics endpoint, so their
//! API tier is a permanent soft failure and extraction relies on the scrape
//! and estimate tiers.

pub mod facebook;
pub mod instagram;
pub mod twitter;
pub mod youtube;

use kpix_core::{AppConfig, EngagementMetrics, Platform};
use tracing::info;

use crate::error::ExtractError;

pub use facebook::FacebookClient;
pub use instagram::InstagramClient;
pub use twitter::{TwitterClient, TwitterProfile};
pub use youtube::YoutubeClient;

/// The API backend for one platform. `Missing` covers unconfigured
/// credentials; `Unsupported` covers platforms without an API tier at all.
pub enum ApiTier {
    Youtube(YoutubeClient),
    Facebook(FacebookClient),
    Instagram(InstagramClient),
    Twitter(TwitterClient),
    Missing(Platform),
    Unsupported(Platform),
}

impl ApiTier {
    /// Builds the tier for a platform from whatever credentials are present.
    ///
    /// # Errors
    /// Returns [`ExtractError::Http`] when a client's HTTP stack cannot be
    /// constructed.
    pub fn from_config(platform: Platform, config: &AppConfig) -> Result<Self, ExtractError> {
        let timeout = config.request_timeout_secs;
        let ua = &config.user_agent;
        let creds = &config.credentials;

        let tier = match platform {
            Platform::Youtube => match &creds.youtube_api_key {
                Some(key) => ApiTier::Youtube(YoutubeClient::new(key, timeout, ua)?),
                None => ApiTier::Missing(platform),
            },
            Platform::Facebook => match &creds.facebook_access_token {
                Some(token) => ApiTier::Facebook(FacebookClient::new(token, timeout, ua)?),
                None => ApiTier::Missing(platform),
            },
            Platform::Instagram => {
                match (&creds.instagram_access_token, &creds.instagram_business_account) {
                    (Some(token), Some(account)) => {
                        ApiTier::Instagram(InstagramClient::new(token, account, timeout, ua)?)
                    }
                    _ => ApiTier::Missing(platform),
                }
            }
            Platform::Twitter => match &creds.twitter_bearer_token {
                Some(token) => ApiTier::Twitter(TwitterClient::new(token, timeout, ua)?),
                None => ApiTier::Missing(platform),
            },
            Platform::Linkedin | Platform::Tiktok => ApiTier::Unsupported(platform),
        };

        if matches!(tier, ApiTier::Missing(_)) {
            info!(%platform, "no API credentials configured, API tier disabled");
        }
        Ok(tier)
    }

    /// Follower count via the official API.
    ///
    /// # Errors
    /// `CredentialsMissing` / `Unsupported` when the tier is unavailable,
    /// otherwise the client's own soft failures.
    pub async fn followers(&self, handle: &str) -> Result<u64, ExtractError> {
        match self {
            ApiTier::Youtube(client) => client.followers(handle).await,
            ApiTier::Facebook(client) => client.followers(handle).await,
            ApiTier::Instagram(client) => client.followers(handle).await,
            ApiTier::Twitter(client) => client.followers(handle).await,
            ApiTier::Missing(platform) => Err(ExtractError::CredentialsMissing {
                platform: *platform,
            }),
            ApiTier::Unsupported(platform) => Err(ExtractError::Unsupported {
                platform: *platform,
            }),
        }
    }

    /// Engagement via the official API. Only YouTube exposes enough per-post
    /// statistics to compute this.
    ///
    /// # Errors
    /// Same availability semantics as [`ApiTier::followers`].
    pub async fn engagement(&self, handle: &str) -> Result<EngagementMetrics, ExtractError> {
        match self {
            ApiTier::Youtube(client) => client.engagement(handle).await,
            ApiTier::Facebook(_) => Err(ExtractError::Unsupported {
                platform: Platform::Facebook,
            }),
            ApiTier::Instagram(_) => Err(ExtractError::Unsupported {
                platform: Platform::Instagram,
            }),
            ApiTier::Twitter(_) => Err(ExtractError::Unsupported {
                platform: Platform::Twitter,
            }),
            ApiTier::Missing(platform) => Err(ExtractError::CredentialsMissing {
                platform: *platform,
            }),
            ApiTier::Unsupported(platform) => Err(ExtractError::Unsupported {
                platform: *platform,
            }),
        }
    }
}
