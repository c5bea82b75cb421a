//! Per-platform extraction descriptors.
//!
//! One static table replaces a class-per-platform hierarchy: everything that
//! differs between platforms (profile URL shape, login-wall markers, DOM
//! selectors, estimation constants) lives here, and a single generic
//! extractor reads it.

use kpix_core::Platform;

/// Assumed engagement profile used by the estimate tier when scraping fails.
/// Shares are fractions of total engagement attributed to likes, comments
/// and shares respectively.
#[derive(Debug, Clone, Copy)]
pub struct EstimateParams {
    pub engagement_rate: f64,
    pub likes_share: f64,
    pub comments_share: f64,
    pub shares_share: f64,
    pub assumed_posts: u64,
}

/// Static per-platform configuration consumed by the generic extractor.
#[derive(Debug, Clone, Copy)]
pub struct PlatformDescriptor {
    pub platform: Platform,
    /// `{handle}` is replaced with the bare profile handle.
    pub profile_url_template: &'static str,
    /// Substrings in the final URL or page title that indicate a login wall.
    pub login_wall_markers: &'static [&'static str],
    /// CSS selectors tried in order when reading the follower count from the
    /// DOM. Markup drifts, so several independent options are kept.
    pub follower_selectors: &'static [&'static str],
    /// Whether an official API tier exists for this platform.
    pub has_api_tier: bool,
    pub estimate: EstimateParams,
}

static FACEBOOK: PlatformDescriptor = PlatformDescriptor {
    platform: Platform::Facebook,
    profile_url_template: "https://www.facebook.com/{handle}",
    login_wall_markers: &["/login", "login.php", "You must log in"],
    follower_selectors: &["a[href*='followers'] strong", "a[href*='followers']"],
    has_api_tier: true,
    estimate: EstimateParams {
        engagement_rate: 0.01,
        likes_share: 0.8,
        comments_share: 0.15,
        shares_share: 0.05,
        assumed_posts: 10,
    },
};

static INSTAGRAM: PlatformDescriptor = PlatformDescriptor {
    platform: Platform::Instagram,
    profile_url_template: "https://www.instagram.com/{handle}/",
    login_wall_markers: &["/accounts/login", "Log in to Instagram"],
    follower_selectors: &[
        "a[href*='followers'] span",
        "a[href$='/followers/'] span",
        "section ul li:nth-child(2) span",
    ],
    has_api_tier: true,
    estimate: EstimateParams {
        engagement_rate: 0.02,
        likes_share: 0.85,
        comments_share: 0.15,
        shares_share: 0.0,
        assumed_posts: 10,
    },
};

static YOUTUBE: PlatformDescriptor = PlatformDescriptor {
    platform: Platform::Youtube,
    profile_url_template: "https://www.youtube.com/{handle}",
    login_wall_markers: &["accounts.google.com"],
    follower_selectors: &["#subscriber-count", "yt-formatted-string#subscriber-count"],
    has_api_tier: true,
    estimate: EstimateParams {
        engagement_rate: 0.02,
        likes_share: 0.9,
        comments_share: 0.1,
        shares_share: 0.0,
        assumed_posts: 10,
    },
};

static LINKEDIN: PlatformDescriptor = PlatformDescriptor {
    platform: Platform::Linkedin,
    profile_url_template: "https://www.linkedin.com/in/{handle}/",
    login_wall_markers: &["/authwall", "/login", "Sign in to LinkedIn"],
    follower_selectors: &[".org-top-card-summary-info-list__info-item"],
    has_api_tier: false,
    estimate: EstimateParams {
        engagement_rate: 0.015,
        likes_share: 0.8,
        comments_share: 0.2,
        shares_share: 0.0,
        assumed_posts: 10,
    },
};

static TWITTER: PlatformDescriptor = PlatformDescriptor {
    platform: Platform::Twitter,
    profile_url_template: "https://x.com/{handle}",
    login_wall_markers: &["/i/flow/login", "Log in to X"],
    follower_selectors: &["a[href$='/verified_followers'] span", "a[href$='/followers'] span"],
    has_api_tier: true,
    // retweets count as shares, replies as comments
    estimate: EstimateParams {
        engagement_rate: 0.007,
        likes_share: 0.7,
        comments_share: 0.1,
        shares_share: 0.2,
        assumed_posts: 10,
    },
};

static TIKTOK: PlatformDescriptor = PlatformDescriptor {
    platform: Platform::Tiktok,
    profile_url_template: "https://www.tiktok.com/@{handle}",
    login_wall_markers: &["/login", "Log in to TikTok"],
    follower_selectors: &["strong[data-e2e='followers-count']"],
    has_api_tier: false,
    estimate: EstimateParams {
        engagement_rate: 0.10,
        likes_share: 0.9,
        comments_share: 0.1,
        shares_share: 0.0,
        assumed_posts: 10,
    },
};

#[must_use]
pub fn descriptor(platform: Platform) -> &'static PlatformDescriptor {
    match platform {
        Platform::Facebook => &FACEBOOK,
        Platform::Instagram => &INSTAGRAM,
        Platform::Youtube => &YOUTUBE,
        Platform::Linkedin => &LINKEDIN,
        Platform::Twitter => &TWITTER,
        Platform::Tiktok => &TIKTOK,
    }
}

impl PlatformDescriptor {
    /// Resolves a target (full URL or bare handle) to the profile page URL.
    #[must_use]
    pub fn profile_url(&self, target: &str) -> String {
        let trimmed = target.trim();
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            self.profile_url_template
                .replace("{handle}", trimmed.trim_start_matches('@'))
        }
    }

    /// Pulls the bare handle out of a target for API lookups. The last path
    /// segment of a URL, minus query string and `@` prefix.
    #[must_use]
    pub fn handle(&self, target: &str) -> String {
        let trimmed = target.trim().trim_end_matches('/');
        let without_query = trimmed.split('?').next().unwrap_or(trimmed);
        let segment = without_query
            .rsplit('/')
            .next()
            .unwrap_or(without_query);
        segment.trim_start_matches('@').to_string()
    }
}
