use kpix_core::AppConfig;

/// Launch and pooling settings for headless Chrome instances.
#[derive(Debug, Clone)]
pub struct BrowserPoolConfig {
    /// Maximum number of concurrently live browser instances.
    pub pool_size: usize,
    pub headless: bool,
    pub page_load_timeout_secs: u64,
    /// Explicit executable path; when `None` the well-known locations are scanned.
    pub chrome_path: Option<String>,
    /// Forwarded to Chrome as `--proxy-server` when set.
    pub proxy: Option<String>,
    pub user_agent: String,
}

impl BrowserPoolConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            pool_size: config.browser_pool_size.max(1),
            headless: config.headless,
            page_load_timeout_secs: config.page_load_timeout_secs,
            chrome_path: std::env::var("KPIX_CHROME_PATH").ok(),
            proxy: None,
            user_agent: config.user_agent.clone(),
        }
    }
}

impl Default for BrowserPoolConfig {
    fn default() -> Self {
        Self {
            pool_size: 3,
            headless: true,
            page_load_timeout_secs: 30,
            chrome_path: None,
            proxy: None,
            user_agent: concat!(
                "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 ",
                "(KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36"
            )
            .to_string(),
        }
    }
}
