//! Facebook Graph API client. Page follower counts only; engagement for
//! Facebook comes from the scrape tier.

use std::time::Duration;

use kpix_core::Platform;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::ExtractError;

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v19.0/";

#[derive(Debug, Deserialize)]
struct PageResponse {
    followers_count: Option<u64>,
    // older pages expose fan_count instead
    fan_count: Option<u64>,
}

pub struct FacebookClient {
    client: Client,
    access_token: String,
    base_url: Url,
}

impl FacebookClient {
    /// # Errors
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built.
    pub fn new(
        access_token: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ExtractError> {
        Self::with_base_url(access_token, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Custom base URL for wiremock tests.
    ///
    /// # Errors
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built, or
    /// [`ExtractError::InvalidUrl`] for an unparseable base URL.
    pub fn with_base_url(
        access_token: &str,
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
            access_token: access_token.to_owned(),
            base_url: Url::parse(&normalised)?,
        })
    }

    /// Follower count for a page handle or numeric page id.
    ///
    /// # Errors
    /// Soft failures per the tier contract; 429 maps to
    /// [`ExtractError::RateLimited`].
    pub async fn followers(&self, handle: &str) -> Result<u64, ExtractError> {
        let mut url = self.base_url.join(handle)?;
        url.query_pairs_mut()
            .append_pair("fields", "followers_count,fan_count")
            .append_pair("access_token", &self.access_token);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ExtractError::RateLimited {
                platform: Platform::Facebook,
                retry_after_secs: 60,
            });
        }
        if !status.is_success() {
            return Err(ExtractError::UnexpectedStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response.text().await?;
        let page: PageResponse =
            serde_json::from_str(&body).map_err(|e| ExtractError::Deserialize {
                context: format!("facebook page '{handle}'"),
                source: e,
            })?;

        page.followers_count
            .or(page.fan_count)
            .ok_or_else(|| ExtractError::MarkupMismatch {
                platform: Platform::Facebook,
                target: handle.to_owned(),
            })
    }
}
