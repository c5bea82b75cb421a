//! Twitter/X API v2 client. Bearer-token auth, public metrics only.

use std::time::Duration;

use kpix_core::Platform;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::ExtractError;

const DEFAULT_BASE_URL: &str = "https://api.twitter.com/";

#[derive(Debug, Deserialize)]
struct UserResponse {
    data: Option<UserData>,
}

#[derive(Debug, Deserialize)]
struct UserData {
    public_metrics: Option<PublicMetrics>,
    verified: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct PublicMetrics {
    followers_count: Option<u64>,
    following_count: Option<u64>,
    tweet_count: Option<u64>,
}

/// Publicly visible account metrics.
#[derive(Debug, Clone, Copy)]
pub struct TwitterProfile {
    pub followers: u64,
    pub following: Option<u64>,
    pub tweets: Option<u64>,
    pub verified: Option<bool>,
}

pub struct TwitterClient {
    client: Client,
    bearer_token: String,
    base_url: Url,
}

impl TwitterClient {
    /// # Errors
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built.
    pub fn new(
        bearer_token: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ExtractError> {
        Self::with_base_url(bearer_token, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Custom base URL for wiremock tests.
    ///
    /// # Errors
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built, or
    /// [`ExtractError::InvalidUrl`] for an unparseable base URL.
    pub fn with_base_url(
        bearer_token: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, ExtractError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent.to_owned())
            .build()?;
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        Ok(Self {
            client,
            bearer_token: bearer_token.to_owned(),
            base_url: Url::parse(&normalised)?,
        })
    }

    /// Public metrics for a username.
    ///
    /// # Errors
    /// Soft failures per the tier contract; the v2 API's 429 carries no
    /// useful retry-after here, so a conservative 900s window is assumed.
    pub async fn profile(&self, username: &str) -> Result<TwitterProfile, ExtractError> {
        let mut url = self
            .base_url
            .join(&format!("2/users/by/username/{username}"))?;
        url.query_pairs_mut()
            .append_pair("user.fields", "public_metrics,verified");

        let response = self
            .client
            .get(url.clone())
            .bearer_auth(&self.bearer_token)
            .send()
            .await?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ExtractError::RateLimited {
                platform: Platform::Twitter,
                retry_after_secs: 900,
            });
        }
        if !status.is_success() {
            return Err(ExtractError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let parsed: UserResponse =
            serde_json::from_str(&body).map_err(|e| ExtractError::Deserialize {
                context: format!("twitter user '{username}'"),
                source: e,
            })?;

        let data = parsed.data.ok_or_else(|| ExtractError::MarkupMismatch {
            platform: Platform::Twitter,
            target: username.to_owned(),
        })?;
        let metrics = data
            .public_metrics
            .ok_or_else(|| ExtractError::MarkupMismatch {
                platform: Platform::Twitter,
                target: username.to_owned(),
            })?;
        let followers = metrics
            .followers_count
            .ok_or_else(|| ExtractError::MarkupMismatch {
                platform: Platform::Twitter,
                target: username.to_owned(),
            })?;

        Ok(TwitterProfile {
            followers,
            following: metrics.following_count,
            tweets: metrics.tweet_count,
            verified: data.verified,
        })
    }

    /// Follower count only.
    ///
    /// # Errors
    /// Same semantics as [`TwitterClient::profile`].
    pub async fn followers(&self, username: &str) -> Result<u64, ExtractError> {
        Ok(self.profile(username).await?.followers)
    }
}
