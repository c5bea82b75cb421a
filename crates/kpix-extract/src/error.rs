//! Error taxonomy for the extraction tiers.

use kpix_core::Platform;
use thiserror::Error;

/// Errors produced by the API, scrape and estimate tiers.
///
/// The orchestrator treats [`ExtractError::RateLimited`] and
/// [`ExtractError::Http`] as transient; everything else fails the tier
/// immediately and falls through to the next one.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to deserialize {context}: {source}")]
    Deserialize {
        context: String,
        source: serde_json::Error,
    },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("no credentials configured for {platform}")]
    CredentialsMissing { platform: Platform },

    #[error("rate limited by {platform}, retry after {retry_after_secs}s")]
    RateLimited {
        platform: Platform,
        retry_after_secs: u64,
    },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("{platform} served a login wall for {target}")]
    LoginWall { platform: Platform, target: String },

    #[error("no follower count found in {platform} page markup for {target}")]
    MarkupMismatch { platform: Platform, target: String },

    #[error("{platform} has no supported API tier")]
    Unsupported { platform: Platform },

    #[error(transparent)]
    Browser(#[from] kpix_browser::BrowserError),

    #[error("extraction timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

impl ExtractError {
    /// Transient errors are worth retrying after a backoff delay; the rest
    /// would fail the same way again.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExtractError::RateLimited { .. } | ExtractError::Http(_)
        )
    }
}
