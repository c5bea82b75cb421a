//! YouTube Data API v3 client.
//!
//! Follower counts come from `channels?part=statistics`. Handles are resolved
//! to channel ids first (cached in-process, the resolution costs quota) and
//! `subscriberCount` arrives as a JSON string. Engagement averages the
//! statistics of the channel's most recent uploads.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use kpix_core::{EngagementMetrics, ExtractionMethod, Platform};
use reqwest::{Client, Url};
use serde::Deserialize;
use tracing::debug;

use crate::error::ExtractError;

const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3/";
const RECENT_VIDEO_SAMPLE: usize = 10;

#[derive(Debug, Deserialize)]
struct ChannelListResponse {
    #[serde(default)]
    items: Vec<ChannelItem>,
}

#[derive(Debug, Deserialize)]
struct ChannelItem {
    id: String,
    statistics: Option<ChannelStatistics>,
    #[serde(rename = "contentDetails")]
    content_details: Option<ContentDetails>,
}

#[derive(Debug, Deserialize)]
struct ChannelStatistics {
    // the API serializes counts as strings
    #[serde(rename = "subscriberCount")]
    subscriber_count: Option<String>,
    #[serde(rename = "hiddenSubscriberCount", default)]
    hidden_subscriber_count: bool,
    #[serde(rename = "videoCount")]
    video_count: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    #[serde(rename = "relatedPlaylists")]
    related_playlists: RelatedPlaylists,
}

#[derive(Debug, Deserialize)]
struct RelatedPlaylists {
    uploads: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchListResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
}

#[derive(Debug, Deserialize)]
struct SearchItemId {
    #[serde(rename = "channelId")]
    channel_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemsResponse {
    #[serde(default)]
    items: Vec<PlaylistItem>,
}

#[derive(Debug, Deserialize)]
struct PlaylistItem {
    #[serde(rename = "contentDetails")]
    content_details: PlaylistItemContent,
}

#[derive(Debug, Deserialize)]
struct PlaylistItemContent {
    #[serde(rename = "videoId")]
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    statistics: Option<VideoStatistics>,
}

#[derive(Debug, Deserialize)]
struct VideoStatistics {
    #[serde(rename = "viewCount")]
    view_count: Option<String>,
    #[serde(rename = "likeCount")]
    like_count: Option<String>,
    #[serde(rename = "commentCount")]
    comment_count: Option<String>,
}

fn parse_count(raw: Option<&str>) -> u64 {
    raw.and_then(|s| s.parse().ok()).unwrap_or(0)
}

/// Client for the YouTube Data API v3.
pub struct YoutubeClient {
    client: Client,
    api_key: String,
    base_url: Url,
    // handle -> channel id; resolution costs 100 quota units per call
    id_cache: Mutex<HashMap<String, String>>,
}

impl YoutubeClient {
    /// # Errors
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, ExtractError> {
        Self::with_base_url(api_key, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Custom base URL for wiremock tests.
    ///
    /// # Errors
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built, or
    /// [`ExtractError::InvalidUrl`] for an unparseable base URL.
    pub fn with_base_url(
        api_key: &str,
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
        let base_url = Url::parse(&normalised)?;
        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
            id_cache: Mutex::new(HashMap::new()),
        })
    }

    fn build_url(&self, resource: &str, params: &[(&str, &str)]) -> Result<Url, ExtractError> {
        let mut url = self.base_url.join(resource)?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("key", &self.api_key);
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
        context: &str,
    ) -> Result<T, ExtractError> {
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if status.as_u16() == 429 {
            return Err(ExtractError::RateLimited {
                platform: Platform::Youtube,
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
        serde_json::from_str(&body).map_err(|e| ExtractError::Deserialize {
            context: context.to_owned(),
            source: e,
        })
    }

    /// Resolve a handle (or raw channel id) to a channel id. Raw `UC…` ids
    /// pass through untouched.
    async fn resolve_channel_id(&self, handle: &str) -> Result<String, ExtractError> {
        if handle.starts_with("UC") && handle.len() == 24 {
            return Ok(handle.to_owned());
        }
        if let Some(cached) = self.id_cache.lock().ok().and_then(|c| c.get(handle).cloned()) {
            return Ok(cached);
        }

        // forHandle resolves modern @handles directly
        let url = self.build_url(
            "channels",
            &[("part", "id"), ("forHandle", handle)],
        )?;
        let listed: ChannelListResponse = self.get_json(url, "channels(forHandle)").await?;
        let id = if let Some(item) = listed.items.into_iter().next() {
            item.id
        } else {
            // legacy usernames and vanity URLs need a search fallback
            let url = self.build_url(
                "search",
                &[("part", "id"), ("type", "channel"), ("maxResults", "1"), ("q", handle)],
            )?;
            let found: SearchListResponse = self.get_json(url, "search(channel)").await?;
            found
                .items
                .into_iter()
                .find_map(|item| item.id.channel_id)
                .ok_or_else(|| ExtractError::MarkupMismatch {
                    platform: Platform::Youtube,
                    target: handle.to_owned(),
                })?
        };

        if let Ok(mut cache) = self.id_cache.lock() {
            cache.insert(handle.to_owned(), id.clone());
        }
        Ok(id)
    }

    /// Subscriber count for a handle or channel id.
    ///
    /// # Errors
    /// Soft failures the orchestrator falls through on: hidden subscriber
    /// counts surface as [`ExtractError::MarkupMismatch`].
    pub async fn followers(&self, handle: &str) -> Result<u64, ExtractError> {
        let channel_id = self.resolve_channel_id(handle).await?;
        let url = self.build_url(
            "channels",
            &[("part", "statistics"), ("id", &channel_id)],
        )?;
        let listed: ChannelListResponse = self.get_json(url, "channels(statistics)").await?;
        let stats = listed
            .items
            .into_iter()
            .next()
            .and_then(|item| item.statistics)
            .ok_or_else(|| ExtractError::MarkupMismatch {
                platform: Platform::Youtube,
                target: handle.to_owned(),
            })?;

        if stats.hidden_subscriber_count {
            debug!(handle, "subscriber count hidden");
            return Err(ExtractError::MarkupMismatch {
                platform: Platform::Youtube,
                target: handle.to_owned(),
            });
        }
        Ok(parse_count(stats.subscriber_count.as_deref()))
    }

    /// Average like/comment/view statistics over the channel's recent uploads.
    ///
    /// # Errors
    /// Same soft-failure semantics as [`YoutubeClient::followers`].
    pub async fn engagement(&self, handle: &str) -> Result<EngagementMetrics, ExtractError> {
        let channel_id = self.resolve_channel_id(handle).await?;

        let url = self.build_url(
            "channels",
            &[("part", "contentDetails,statistics"), ("id", &channel_id)],
        )?;
        let listed: ChannelListResponse = self.get_json(url, "channels(contentDetails)").await?;
        let item = listed.items.into_iter().next().ok_or_else(|| {
            ExtractError::MarkupMismatch {
                platform: Platform::Youtube,
                target: handle.to_owned(),
            }
        })?;
        let video_count = item
            .statistics
            .as_ref()
            .map(|s| parse_count(s.video_count.as_deref()));
        let uploads = item
            .content_details
            .and_then(|cd| cd.related_playlists.uploads)
            .ok_or_else(|| ExtractError::MarkupMismatch {
                platform: Platform::Youtube,
                target: handle.to_owned(),
            })?;

        let url = self.build_url(
            "playlistItems",
            &[
                ("part", "contentDetails"),
                ("playlistId", &uploads),
                ("maxResults", "10"),
            ],
        )?;
        let playlist: PlaylistItemsResponse = self.get_json(url, "playlistItems").await?;
        let video_ids: Vec<String> = playlist
            .items
            .into_iter()
            .take(RECENT_VIDEO_SAMPLE)
            .map(|item| item.content_details.video_id)
            .collect();
        if video_ids.is_empty() {
            return Err(ExtractError::MarkupMismatch {
                platform: Platform::Youtube,
                target: handle.to_owned(),
            });
        }

        let ids = video_ids.join(",");
        let url = self.build_url("videos", &[("part", "statistics"), ("id", &ids)])?;
        let videos: VideoListResponse = self.get_json(url, "videos(statistics)").await?;

        let mut likes = 0u64;
        let mut comments = 0u64;
        let mut views = 0u64;
        let mut sampled = 0u64;
        for video in videos.items {
            let Some(stats) = video.statistics else {
                continue;
            };
            likes += parse_count(stats.like_count.as_deref());
            comments += parse_count(stats.comment_count.as_deref());
            views += parse_count(stats.view_count.as_deref());
            sampled += 1;
        }
        if sampled == 0 {
            return Err(ExtractError::MarkupMismatch {
                platform: Platform::Youtube,
                target: handle.to_owned(),
            });
        }

        let avg_likes = likes / sampled;
        let avg_comments = comments / sampled;
        Ok(EngagementMetrics {
            avg_likes: Some(avg_likes),
            avg_comments: Some(avg_comments),
            avg_shares: None,
            avg_views: Some(views / sampled),
            posts_count: video_count,
            total_engagement: Some(avg_likes + avg_comments),
            estimated: false,
            method: ExtractionMethod::Api,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> YoutubeClient {
        YoutubeClient::with_base_url("test-key", 30, "kpix-test/0.1", base_url)
            .expect("client construction should not fail")
    }

    #[tokio::test]
    async fn followers_parses_string_subscriber_count() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("forHandle", "MrBeast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "UCX6OQ3DkcsbYNE6H8uQQuVA"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("part", "statistics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "UCX6OQ3DkcsbYNE6H8uQQuVA",
                    "statistics": {"subscriberCount": "30300", "hiddenSubscriberCount": false}
                }]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert_eq!(client.followers("MrBeast").await.unwrap(), 30_300);
    }

    #[tokio::test]
    async fn resolution_falls_back_to_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("forHandle", "pewdiepie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"items": []})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("q", "pewdiepie"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": {"channelId": "UC-lHJZR3Gqxm24_Vd_AJ5Yw"}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("part", "statistics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "UC-lHJZR3Gqxm24_Vd_AJ5Yw",
                    "statistics": {"subscriberCount": "111000000"}
                }]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert_eq!(client.followers("pewdiepie").await.unwrap(), 111_000_000);
    }

    #[tokio::test]
    async fn hidden_subscriber_count_is_soft_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("forHandle", "hidden"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "UCxxxxxxxxxxxxxxxxxxxxxx"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("part", "statistics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "UCxxxxxxxxxxxxxxxxxxxxxx",
                    "statistics": {"hiddenSubscriberCount": true}
                }]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(matches!(
            client.followers("hidden").await,
            Err(ExtractError::MarkupMismatch { .. })
        ));
    }

    #[tokio::test]
    async fn quota_exhaustion_maps_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        assert!(matches!(
            client.followers("whoever").await,
            Err(ExtractError::RateLimited { .. })
        ));
    }

    #[tokio::test]
    async fn engagement_averages_recent_videos() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("forHandle", "TEDx"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{"id": "UCyyyyyyyyyyyyyyyyyyyyyy"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/channels"))
            .and(query_param("part", "contentDetails,statistics"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [{
                    "id": "UCyyyyyyyyyyyyyyyyyyyyyy",
                    "statistics": {"videoCount": "250"},
                    "contentDetails": {"relatedPlaylists": {"uploads": "UUyyyy"}}
                }]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/playlistItems"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"contentDetails": {"videoId": "a"}},
                    {"contentDetails": {"videoId": "b"}}
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "items": [
                    {"statistics": {"likeCount": "100", "commentCount": "10", "viewCount": "1000"}},
                    {"statistics": {"likeCount": "300", "commentCount": "30", "viewCount": "3000"}}
                ]
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let metrics = client.engagement("TEDx").await.unwrap();
        assert_eq!(metrics.avg_likes, Some(200));
        assert_eq!(metrics.avg_comments, Some(20));
        assert_eq!(metrics.avg_views, Some(2000));
        assert_eq!(metrics.posts_count, Some(250));
        assert!(!metrics.estimated);
    }
}
