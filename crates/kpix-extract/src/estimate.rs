//! Estimate tier: engagement derived from the follower count using assumed
//! per-platform engagement rates. Always flagged `estimated` so consumers
//! never mistake it for measured data. Followers are never estimated.

use kpix_core::{EngagementMetrics, ExtractionMethod};
use tracing::debug;

use crate::descriptor::PlatformDescriptor;

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn share_of(total: u64, fraction: f64) -> u64 {
    (total as f64 * fraction) as u64
}

/// Engagement metrics assumed from the follower count.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
pub fn estimate_engagement(
    descriptor: &PlatformDescriptor,
    followers: u64,
) -> EngagementMetrics {
    let params = descriptor.estimate;
    let total = (followers as f64 * params.engagement_rate) as u64;
    debug!(
        platform = %descriptor.platform,
        followers,
        total,
        "estimating engagement from follower count"
    );

    let shares = share_of(total, params.shares_share);
    EngagementMetrics {
        avg_likes: Some(share_of(total, params.likes_share)),
        avg_comments: Some(share_of(total, params.comments_share)),
        avg_shares: if shares > 0 { Some(shares) } else { None },
        avg_views: None,
        posts_count: Some(params.assumed_posts),
        total_engagement: Some(total),
        estimated: true,
        method: ExtractionMethod::Estimate,
    }
}
