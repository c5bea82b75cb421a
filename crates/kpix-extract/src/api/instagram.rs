//! Instagram Graph API client using business discovery.
//!
//! The Graph API cannot look up arbitrary accounts directly; queries go
//! through a configured business account id with
//! `business_discovery.username(...)`.

use std::time::Duration;

use kpix_core::Platform;
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::error::ExtractError;

const DEFAULT_BASE_URL: &str = "https://graph.facebook.com/v19.0/";

#[derive(Debug, Deserialize)]
struct DiscoveryResponse {
    business_discovery: Option<BusinessDiscovery>,
}

#[derive(Debug, Deserialize)]
struct BusinessDiscovery {
    followers_count: Option<u64>,
}

pub struct InstagramClient {
    client: Client,
    access_token: String,
    business_account: String,
    base_url: Url,
}

impl InstagramClient {
    /// # Errors
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built.
    pub fn new(
        access_token: &str,
        business_account: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ExtractError> {
        Self::with_base_url(
            access_token,
            business_account,
            timeout_secs,
            user_agent,
            DEFAULT_BASE_URL,
        )
    }

    /// Custom base URL for wiremock tests.
    ///
    /// # Errors
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built, or
    /// [`ExtractError::InvalidUrl`] for an unparseable base URL.
    pub fn with_base_url(
        access_token: &str,
        business_account: &str,
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
            business_account: business_account.to_owned(),
            base_url: Url::parse(&normalised)?,
        })
    }

    /// Follower count for a public Instagram username.
    ///
    /// # Errors
    /// Soft failures per the tier contract; 429 maps to
    /// [`ExtractError::RateLimited`].
    pub async fn followers(&self, username: &str) -> Result<u64, ExtractError> {
        let mut url = self.base_url.join(&self.business_account)?;
        url.query_pairs_mut()
            .append_pair(
                "fields",
                &format!("business_discovery.username({username}){{followers_count}}"),
            )
            .append_pair("access_token", &self.access_token);

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ExtractError::RateLimited {
                platform: Platform::Instagram,
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
        let parsed: DiscoveryResponse =
            serde_json::from_str(&body).map_err(|e| ExtractError::Deserialize {
                context: format!("instagram business_discovery '{username}'"),
                source: e,
            })?;

        parsed
            .business_discovery
            .and_then(|d| d.followers_count)
            .ok_or_else(|| ExtractError::MarkupMismatch {
                platform: Platform::Instagram,
                target: username.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> InstagramClient {
        InstagramClient::with_base_url("test-token", "17841400000000000", 30, "kpix-test/0.1", base_url)
            .expect("client construction should not fail")
    }

    #[tokio::test]
    async fn discovery_returns_follower_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/17841400000000000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "business_discovery": {"followers_count": 302_000_000u64}
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert_eq!(client.followers("nike").await.unwrap(), 302_000_000);
    }

    #[tokio::test]
    async fn non_business_account_is_soft_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "178"})))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(matches!(
            client.followers("someone").await,
            Err(ExtractError::MarkupMismatch { .. })
        ));
    }
}
