use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Which store backs the cache's second tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    File,
    Redis,
}

/// How much human-like interaction the scrape tier performs per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimulationLevel {
    Low,
    Medium,
    High,
}

/// Per-platform API credentials. All optional; a missing credential skips the
/// API tier for that platform.
#[derive(Clone, Default)]
pub struct PlatformCredentials {
    pub youtube_api_key: Option<String>,
    pub facebook_access_token: Option<String>,
    pub instagram_access_token: Option<String>,
    pub instagram_business_account: Option<String>,
    pub twitter_bearer_token: Option<String>,
    pub linkedin_access_token: Option<String>,
    pub tiktok_client_key: Option<String>,
}

impl std::fmt::Debug for PlatformCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[redacted]");
        f.debug_struct("PlatformCredentials")
            .field("youtube_api_key", &redact(&self.youtube_api_key))
            .field("facebook_access_token", &redact(&self.facebook_access_token))
            .field(
                "instagram_access_token",
                &redact(&self.instagram_access_token),
            )
            .field(
                "instagram_business_account",
                &self.instagram_business_account,
            )
            .field("twitter_bearer_token", &redact(&self.twitter_bearer_token))
            .field("linkedin_access_token", &redact(&self.linkedin_access_token))
            .field("tiktok_client_key", &redact(&self.tiktok_client_key))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub credentials: PlatformCredentials,
    pub proxy_list: Vec<String>,
    pub proxy_rotation: crate::proxy::ProxyRotation,
    pub headless: bool,
    pub browser_pool_size: usize,
    pub page_load_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub extraction_timeout_secs: u64,
    pub max_retries: u32,
    pub cache_enabled: bool,
    pub cache_backend: CacheBackendKind,
    pub cache_ttl_secs: u64,
    pub cache_dir: PathBuf,
    pub redis_url: String,
    pub human_simulation_level: SimulationLevel,
    pub parallel_extraction: bool,
    pub inter_platform_delay_ms: u64,
    pub api_rate_limit: usize,
    pub user_agent: String,
}
