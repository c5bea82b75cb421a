//! Browser scrape tier.
//!
//! Navigates a pooled page to the public profile URL, runs the configured
//! human interaction, then tries extraction strategies in order: structured
//! meta description, DOM selector query, raw-HTML keyword scan. Markup
//! changes constantly, so no single strategy is trusted.

use std::sync::Arc;

use kpix_browser::{BrowserPool, PageInteraction, PageLease};
use kpix_core::{EngagementMetrics, ExtractionMethod};
use regex::Regex;
use std::sync::OnceLock;
use tracing::{debug, warn};

use crate::descriptor::PlatformDescriptor;
use crate::error::ExtractError;
use crate::parse::{find_count_near_keyword, parse_abbreviated_count};

const ENGAGEMENT_SAMPLE: usize = 10;

fn posts_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)([\d][\d.,]*\s*[KMB]?)\s*(?:posts|videos|tweets)").unwrap()
    })
}

fn likes_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)([\d][\d.,]*\s*[KMB]?)\s*likes").unwrap())
}

fn comments_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)([\d][\d.,]*\s*[KMB]?)\s*comments").unwrap())
}

/// Follower count from free-form markup (meta description or full HTML).
#[must_use]
pub fn followers_from_markup(text: &str) -> Option<u64> {
    find_count_near_keyword(text)
}

fn average_matches(re: &Regex, text: &str) -> Option<u64> {
    let counts: Vec<u64> = re
        .captures_iter(text)
        .take(ENGAGEMENT_SAMPLE)
        .filter_map(|c| parse_abbreviated_count(c.get(1)?.as_str()))
        .collect();
    if counts.is_empty() {
        return None;
    }
    let n = u64::try_from(counts.len()).ok()?;
    Some(counts.iter().sum::<u64>() / n)
}

/// Engagement averages scraped out of visible post markup. `None` when the
/// page exposes no per-post counts at all.
#[must_use]
pub fn engagement_from_markup(text: &str) -> Option<EngagementMetrics> {
    let avg_likes = average_matches(likes_re(), text)?;
    let avg_comments = average_matches(comments_re(), text);
    let posts_count = posts_re()
        .captures(text)
        .and_then(|c| parse_abbreviated_count(c.get(1)?.as_str()));

    Some(EngagementMetrics {
        avg_likes: Some(avg_likes),
        avg_comments,
        avg_shares: None,
        avg_views: None,
        posts_count,
        total_engagement: Some(avg_likes + avg_comments.unwrap_or(0)),
        estimated: false,
        method: ExtractionMethod::Scrape,
    })
}

/// Scrape tier over the shared browser pool. One instance serves every
/// platform; behaviour differences come from the descriptor.
pub struct ScrapeTier {
    pool: Arc<BrowserPool>,
    interaction: Arc<dyn PageInteraction>,
}

impl ScrapeTier {
    #[must_use]
    pub fn new(pool: Arc<BrowserPool>, interaction: Arc<dyn PageInteraction>) -> Self {
        Self { pool, interaction }
    }

    async fn open_profile(
        &self,
        descriptor: &PlatformDescriptor,
        target: &str,
    ) -> Result<PageLease, ExtractError> {
        let url = descriptor.profile_url(target);
        let lease = self.pool.acquire_page().await?;
        self.interaction.before_navigate(lease.page()).await;
        if let Err(err) = lease.goto(&url).await {
            let mut lease = lease;
            lease.mark_broken();
            lease.release().await;
            return Err(err.into());
        }
        self.interaction.after_load(lease.page()).await;
        Ok(lease)
    }

    async fn hit_login_wall(
        lease: &PageLease,
        descriptor: &PlatformDescriptor,
    ) -> bool {
        let current_url = lease
            .page()
            .url()
            .await
            .ok()
            .flatten()
            .unwrap_or_default();
        descriptor
            .login_wall_markers
            .iter()
            .any(|marker| current_url.contains(marker))
    }

    async fn meta_description(lease: &PageLease) -> Option<String> {
        let script = r#"document.querySelector("meta[property='og:description']")?.getAttribute("content")
            || document.querySelector("meta[name='description']")?.getAttribute("content")
            || null"#;
        lease
            .page()
            .evaluate(script)
            .await
            .ok()?
            .into_value::<Option<String>>()
            .ok()
            .flatten()
    }

    async fn query_selector_text(lease: &PageLease, selector: &str) -> Option<String> {
        let script = format!(
            "document.querySelector({})?.textContent || null",
            serde_json::to_string(selector).ok()?
        );
        lease
            .page()
            .evaluate(script)
            .await
            .ok()?
            .into_value::<Option<String>>()
            .ok()
            .flatten()
    }

    /// Follower count via the strategy cascade.
    ///
    /// # Errors
    /// [`ExtractError::LoginWall`] when the page needs auth and the meta
    /// fallback carries no count; [`ExtractError::MarkupMismatch`] when every
    /// strategy came up empty.
    pub async fn followers(
        &self,
        descriptor: &PlatformDescriptor,
        target: &str,
    ) -> Result<u64, ExtractError> {
        let lease = self.open_profile(descriptor, target).await?;
        let result = Self::followers_on_page(&lease, descriptor, target).await;
        lease.release().await;
        result
    }

    async fn followers_on_page(
        lease: &PageLease,
        descriptor: &PlatformDescriptor,
        target: &str,
    ) -> Result<u64, ExtractError> {
        let meta = Self::meta_description(lease).await;

        if Self::hit_login_wall(lease, descriptor).await {
            // behind a login wall only the meta description is public
            warn!(platform = %descriptor.platform, target, "login wall, using meta fallback");
            return meta
                .as_deref()
                .and_then(followers_from_markup)
                .ok_or_else(|| ExtractError::LoginWall {
                    platform: descriptor.platform,
                    target: target.to_owned(),
                });
        }

        if let Some(count) = meta.as_deref().and_then(followers_from_markup) {
            debug!(platform = %descriptor.platform, count, "followers from meta description");
            return Ok(count);
        }

        for selector in descriptor.follower_selectors {
            if let Some(text) = Self::query_selector_text(lease, selector).await {
                if let Some(count) = parse_abbreviated_count(text.trim()) {
                    debug!(platform = %descriptor.platform, count, selector, "followers from DOM");
                    return Ok(count);
                }
            }
        }

        let html = lease.content().await?;
        if let Some(count) = followers_from_markup(&html) {
            debug!(platform = %descriptor.platform, count, "followers from raw HTML");
            return Ok(count);
        }

        Err(ExtractError::MarkupMismatch {
            platform: descriptor.platform,
            target: target.to_owned(),
        })
    }

    /// Engagement averages from visible post markup.
    ///
    /// # Errors
    /// [`ExtractError::LoginWall`] behind auth, [`ExtractError::MarkupMismatch`]
    /// when no per-post counts are visible; the orchestrator then falls back
    /// to estimation.
    pub async fn engagement(
        &self,
        descriptor: &PlatformDescriptor,
        target: &str,
    ) -> Result<EngagementMetrics, ExtractError> {
        let lease = self.open_profile(descriptor, target).await?;

        if Self::hit_login_wall(&lease, descriptor).await {
            lease.release().await;
            return Err(ExtractError::LoginWall {
                platform: descriptor.platform,
                target: target.to_owned(),
            });
        }

        let html = lease.content().await;
        lease.release().await;

        engagement_from_markup(&html?).ok_or_else(|| ExtractError::MarkupMismatch {
            platform: descriptor.platform,
            target: target.to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn followers_from_meta_description() {
        let meta = "302M Followers, 1,574 Following, 1,016 Posts - Nike on Instagram";
        assert_eq!(followers_from_markup(meta), Some(302_000_000));
    }

    #[test]
    fn followers_absent_from_plain_text() {
        assert_eq!(followers_from_markup("a page about nothing"), None);
    }

    #[test]
    fn engagement_averages_visible_posts() {
        let html = "<div>1,016 posts</div>\
                    <span>1.2K likes</span><span>40 comments</span>\
                    <span>800 likes</span><span>60 comments</span>";
        let metrics = engagement_from_markup(html).unwrap();
        assert_eq!(metrics.avg_likes, Some(1000));
        assert_eq!(metrics.avg_comments, Some(50));
        assert_eq!(metrics.posts_count, Some(1016));
        assert_eq!(metrics.total_engagement, Some(1050));
        assert!(!metrics.estimated);
    }

    #[test]
    fn engagement_without_like_counts_is_none() {
        assert!(engagement_from_markup("<div>1,016 posts</div>").is_none());
    }
}
