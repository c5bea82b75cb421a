use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The social platforms KPIX knows how to extract from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Facebook,
    Instagram,
    Youtube,
    Linkedin,
    Twitter,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Facebook,
        Platform::Instagram,
        Platform::Youtube,
        Platform::Linkedin,
        Platform::Twitter,
        Platform::Tiktok,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::Facebook => "facebook",
            Platform::Instagram => "instagram",
            Platform::Youtube => "youtube",
            Platform::Linkedin => "linkedin",
            Platform::Twitter => "twitter",
            Platform::Tiktok => "tiktok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "facebook" => Ok(Platform::Facebook),
            "instagram" => Ok(Platform::Instagram),
            "youtube" => Ok(Platform::Youtube),
            "linkedin" => Ok(Platform::Linkedin),
            "twitter" | "x" => Ok(Platform::Twitter),
            "tiktok" => Ok(Platform::Tiktok),
            other => Err(UnknownPlatform(other.to_owned())),
        }
    }
}

/// Which extraction tier produced a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    Api,
    Scrape,
    Estimate,
}

/// Engagement figures for a profile, averaged over recent posts.
///
/// `estimated` marks values derived from follower count with an assumed
/// per-platform engagement rate rather than measured from posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngagementMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_likes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_comments: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_shares: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_engagement: Option<u64>,
    pub estimated: bool,
    pub method: ExtractionMethod,
}

impl EngagementMetrics {
    /// Sum of the per-post averages that are present, or the explicit total.
    #[must_use]
    pub fn total(&self) -> Option<u64> {
        if let Some(total) = self.total_engagement {
            return Some(total);
        }
        let parts = [self.avg_likes, self.avg_comments, self.avg_shares];
        if parts.iter().all(Option::is_none) {
            return None;
        }
        Some(parts.iter().flatten().sum())
    }
}

/// Immutable snapshot of everything extracted for one platform/target pair.
///
/// A new instance is produced per request; nothing is updated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileKpi {
    pub platform: Platform,
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followers_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub following_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub posts_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_likes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_comments: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_shares: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_views: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_engagement: Option<u64>,
    /// `round(total_engagement / followers_count * 100, 2)`; absent whenever
    /// the follower count is zero or unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engagement_rate: Option<f64>,
    pub estimated: bool,
    pub extraction_timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extraction_method: Option<ExtractionMethod>,
    pub extraction_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ProfileKpi {
    /// An empty, failed snapshot for a target nothing could be extracted from.
    #[must_use]
    pub fn failed(platform: Platform, target: &str, error: impl Into<String>) -> Self {
        Self {
            platform,
            target: target.to_owned(),
            username: None,
            followers_count: None,
            following_count: None,
            posts_count: None,
            verified: None,
            avg_likes: None,
            avg_comments: None,
            avg_shares: None,
            avg_views: None,
            total_engagement: None,
            engagement_rate: None,
            estimated: false,
            extraction_timestamp: Utc::now(),
            extraction_method: None,
            extraction_success: false,
            error_message: Some(error.into()),
        }
    }
}

/// `round(total / followers * 100, 2)`, or `None` when followers is zero.
///
/// Kept free-standing so the orchestrator and tests share one definition.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn engagement_rate(total_engagement: u64, followers: u64) -> Option<f64> {
    if followers == 0 {
        return None;
    }
    let rate = total_engagement as f64 / followers as f64 * 100.0;
    Some((rate * 100.0).round() / 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn platform_round_trips_through_str() {
        for platform in Platform::ALL {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
    }

    #[test]
    fn platform_accepts_x_alias() {
        assert_eq!("x".parse::<Platform>().unwrap(), Platform::Twitter);
        assert_eq!("Twitter".parse::<Platform>().unwrap(), Platform::Twitter);
    }

    #[test]
    fn platform_rejects_unknown() {
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn extraction_method_serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ExtractionMethod::Api).unwrap(),
            serde_json::json!("api")
        );
        assert_eq!(
            serde_json::to_value(ExtractionMethod::Estimate).unwrap(),
            serde_json::json!("estimate")
        );
    }

    #[test]
    fn engagement_rate_basic() {
        assert_eq!(engagement_rate(50, 1000), Some(5.0));
    }

    #[test]
    fn engagement_rate_rounds_to_two_decimals() {
        // 333 / 9997 * 100 = 3.3310...
        assert_eq!(engagement_rate(333, 9997), Some(3.33));
    }

    #[test]
    fn engagement_rate_undefined_for_zero_followers() {
        assert_eq!(engagement_rate(50, 0), None);
    }

    #[test]
    fn engagement_total_prefers_explicit_total() {
        let metrics = EngagementMetrics {
            avg_likes: Some(10),
            avg_comments: Some(5),
            avg_shares: None,
            avg_views: None,
            posts_count: None,
            total_engagement: Some(99),
            estimated: false,
            method: ExtractionMethod::Scrape,
        };
        assert_eq!(metrics.total(), Some(99));
    }

    #[test]
    fn engagement_total_sums_components() {
        let metrics = EngagementMetrics {
            avg_likes: Some(10),
            avg_comments: Some(5),
            avg_shares: Some(1),
            avg_views: Some(1000),
            posts_count: None,
            total_engagement: None,
            estimated: false,
            method: ExtractionMethod::Scrape,
        };
        // Views do not count toward engagement totals.
        assert_eq!(metrics.total(), Some(16));
    }

    #[test]
    fn engagement_total_none_when_empty() {
        let metrics = EngagementMetrics {
            avg_likes: None,
            avg_comments: None,
            avg_shares: None,
            avg_views: None,
            posts_count: None,
            total_engagement: None,
            estimated: false,
            method: ExtractionMethod::Scrape,
        };
        assert_eq!(metrics.total(), None);
    }

    #[test]
    fn failed_snapshot_is_unsuccessful() {
        let kpi = ProfileKpi::failed(Platform::Tiktok, "charlidamelio", "no tier succeeded");
        assert!(!kpi.extraction_success);
        assert!(kpi.followers_count.is_none());
        assert_eq!(kpi.error_message.as_deref(), Some("no tier succeeded"));
    }

    #[test]
    fn profile_kpi_omits_absent_fields_in_json() {
        let kpi = ProfileKpi::failed(Platform::Youtube, "@MrBeast", "err");
        let json = serde_json::to_value(&kpi).unwrap();
        assert!(json.get("engagement_rate").is_none());
        assert!(json.get("followers_count").is_none());
        assert_eq!(json["platform"], "youtube");
    }
}
