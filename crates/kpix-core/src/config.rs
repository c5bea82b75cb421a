use std::net::SocketAddr;
use std::path::PathBuf;

use crate::app_config::{
    AppConfig, CacheBackendKind, Environment, PlatformCredentials, SimulationLevel,
};
use crate::proxy::ProxyRotation;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// Configuration loading never fails: a malformed value is logged and its
/// default substituted, so a bad `.env` file degrades rather than aborting.
#[must_use]
pub fn load_app_config() -> AppConfig {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the
/// process, without touching `.env` files.
#[must_use]
pub fn load_app_config_from_env() -> AppConfig {
    build_app_config(|key| std::env::var(key))
}

/// Build configuration using the provided env-var lookup function.
///
/// The lookup indirection decouples parsing from the actual environment so
/// tests can drive it with a plain `HashMap` — no `set_var`/`remove_var`.
pub fn build_app_config<F>(lookup: F) -> AppConfig
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let optional = |var: &str| -> Option<String> {
        lookup(var).ok().filter(|s| !s.trim().is_empty())
    };

    let or_default = |var: &str, default: &str| -> String {
        optional(var).unwrap_or_else(|| default.to_owned())
    };

    fn parse_or<T: std::str::FromStr>(var: &str, raw: &str, default: T) -> T {
        match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                tracing::warn!(var, raw, "invalid value; using default");
                default
            }
        }
    }

    let bind_addr: SocketAddr = parse_or(
        "KPIX_BIND_ADDR",
        &or_default("KPIX_BIND_ADDR", "0.0.0.0:3000"),
        SocketAddr::from(([0, 0, 0, 0], 3000)),
    );

    let env = match or_default("KPIX_ENV", "development").as_str() {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    };

    let cache_backend = match or_default("KPIX_CACHE_BACKEND", "memory").as_str() {
        "file" => CacheBackendKind::File,
        "redis" => CacheBackendKind::Redis,
        "memory" => CacheBackendKind::Memory,
        other => {
            tracing::warn!(value = other, "unknown cache backend; using memory");
            CacheBackendKind::Memory
        }
    };

    let human_simulation_level = match or_default("KPIX_HUMAN_SIMULATION_LEVEL", "medium").as_str()
    {
        "low" => SimulationLevel::Low,
        "high" => SimulationLevel::High,
        "medium" => SimulationLevel::Medium,
        other => {
            tracing::warn!(value = other, "unknown simulation level; using medium");
            SimulationLevel::Medium
        }
    };

    let proxy_rotation = match or_default("KPIX_PROXY_ROTATION", "round_robin").as_str() {
        "random" => ProxyRotation::Random,
        _ => ProxyRotation::RoundRobin,
    };

    let proxy_list: Vec<String> = optional("KPIX_PROXY_LIST")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToOwned::to_owned)
                .collect()
        })
        .unwrap_or_default();

    let credentials = PlatformCredentials {
        youtube_api_key: optional("KPIX_YOUTUBE_API_KEY"),
        facebook_access_token: optional("KPIX_FACEBOOK_ACCESS_TOKEN"),
        instagram_access_token: optional("KPIX_INSTAGRAM_ACCESS_TOKEN"),
        instagram_business_account: optional("KPIX_INSTAGRAM_BUSINESS_ACCOUNT"),
        twitter_bearer_token: optional("KPIX_TWITTER_BEARER_TOKEN"),
        linkedin_access_token: optional("KPIX_LINKEDIN_ACCESS_TOKEN"),
        tiktok_client_key: optional("KPIX_TIKTOK_CLIENT_KEY"),
    };

    AppConfig {
        env,
        bind_addr,
        log_level: or_default("KPIX_LOG_LEVEL", "info"),
        credentials,
        proxy_list,
        proxy_rotation,
        headless: parse_or("KPIX_HEADLESS", &or_default("KPIX_HEADLESS", "true"), true),
        browser_pool_size: parse_or(
            "KPIX_BROWSER_POOL_SIZE",
            &or_default("KPIX_BROWSER_POOL_SIZE", "3"),
            3,
        ),
        page_load_timeout_secs: parse_or(
            "KPIX_PAGE_LOAD_TIMEOUT_SECS",
            &or_default("KPIX_PAGE_LOAD_TIMEOUT_SECS", "60"),
            60,
        ),
        request_timeout_secs: parse_or(
            "KPIX_REQUEST_TIMEOUT_SECS",
            &or_default("KPIX_REQUEST_TIMEOUT_SECS", "30"),
            30,
        ),
        extraction_timeout_secs: parse_or(
            "KPIX_EXTRACTION_TIMEOUT_SECS",
            &or_default("KPIX_EXTRACTION_TIMEOUT_SECS", "300"),
            300,
        ),
        max_retries: parse_or("KPIX_MAX_RETRIES", &or_default("KPIX_MAX_RETRIES", "3"), 3),
        cache_enabled: parse_or(
            "KPIX_CACHE_ENABLED",
            &or_default("KPIX_CACHE_ENABLED", "true"),
            true,
        ),
        cache_backend,
        cache_ttl_secs: parse_or(
            "KPIX_CACHE_TTL_SECS",
            &or_default("KPIX_CACHE_TTL_SECS", "3600"),
            3600,
        ),
        cache_dir: PathBuf::from(or_default("KPIX_CACHE_DIR", ".cache")),
        redis_url: or_default("KPIX_REDIS_URL", "redis://localhost:6379/0"),
        human_simulation_level,
        parallel_extraction: parse_or(
            "KPIX_PARALLEL_EXTRACTION",
            &or_default("KPIX_PARALLEL_EXTRACTION", "true"),
            true,
        ),
        inter_platform_delay_ms: parse_or(
            "KPIX_INTER_PLATFORM_DELAY_MS",
            &or_default("KPIX_INTER_PLATFORM_DELAY_MS", "3000"),
            3000,
        ),
        api_rate_limit: parse_or(
            "KPIX_API_RATE_LIMIT",
            &or_default("KPIX_API_RATE_LIMIT", "100"),
            100,
        ),
        user_agent: or_default("KPIX_USER_AGENT", "kpix/0.1 (social-kpi-extraction)"),
    }
}
