//! Semaphore-bounded pool of headless Chrome instances.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::config::BrowserPoolConfig;
use crate::error::BrowserError;
use crate::stealth;

const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/opt/google/chrome/google-chrome",
];

/// Locate a Chrome/Chromium executable from the explicit config path, the
/// well-known install locations, or `which`.
fn find_chrome(explicit: Option<&str>) -> Result<PathBuf, BrowserError> {
    if let Some(path) = explicit {
        let p = PathBuf::from(path);
        if p.exists() {
            return Ok(p);
        }
        warn!("configured Chrome path {path} does not exist, scanning defaults");
    }

    for path in CHROME_PATHS {
        let p = std::path::Path::new(path);
        if p.exists() {
            debug!("found Chrome at {path}");
            return Ok(p.to_path_buf());
        }
    }

    for cmd in &["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    debug!("found Chrome in PATH: {path}");
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(BrowserError::ChromeNotFound)
}

/// Pool of launched browsers. Capacity is bounded by a semaphore; browsers
/// are launched lazily and parked on an idle list between leases.
pub struct BrowserPool {
    config: BrowserPoolConfig,
    permits: Arc<Semaphore>,
    idle: Arc<Mutex<Vec<Browser>>>,
}

impl BrowserPool {
    #[must_use]
    pub fn new(config: BrowserPoolConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.pool_size));
        info!(
            pool_size = config.pool_size,
            headless = config.headless,
            "browser pool ready"
        );
        Self {
            config,
            permits,
            idle: Arc::new(Mutex::new(Vec::new())),
        }
    }

    async fn launch(&self) -> Result<Browser, BrowserError> {
        let chrome_path = find_chrome(self.config.chrome_path.as_deref())?;

        let mut builder = BrowserConfig::builder().chrome_executable(chrome_path);
        if !self.config.headless {
            builder = builder.with_head();
        }
        if let Some(ref proxy) = self.config.proxy {
            builder = builder.arg(format!("--proxy-server={proxy}"));
        }
        builder = builder
            .arg("--disable-blink-features=AutomationControlled")
            .arg("--disable-infobars")
            .arg("--disable-dev-shm-usage")
            .arg("--no-first-run")
            .arg("--no-default-browser-check")
            .arg("--disable-background-networking")
            .arg("--disable-sync")
            .arg("--no-sandbox")
            .arg("--disable-gpu");

        let browser_config = builder.build().map_err(BrowserError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config).await?;

        // the CDP event loop stops when the browser process goes away
        tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        Ok(browser)
    }

    /// Lease a fresh page with the pool's user agent and evasion scripts
    /// installed. Blocks while all browsers are leased out.
    pub async fn acquire_page(&self) -> Result<PageLease, BrowserError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| BrowserError::Launch("browser pool closed".to_string()))?;

        let reused = self.idle.lock().await.pop();
        let browser = match reused {
            Some(browser) => browser,
            None => self.launch().await?,
        };

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(err) => {
                // a browser that cannot open pages is dead, do not pool it
                let mut browser = browser;
                let _ = browser.close().await;
                return Err(err.into());
            }
        };

        page.execute(SetUserAgentOverrideParams::new(
            self.config.user_agent.clone(),
        ))
        .await?;
        stealth::apply_evasions(&page).await;

        Ok(PageLease {
            page,
            browser: Some(browser),
            idle: Arc::clone(&self.idle),
            page_load_timeout_secs: self.config.page_load_timeout_secs,
            broken: false,
            _permit: permit,
        })
    }

    /// Close every idle browser. Leased browsers close when their leases are
    /// discarded.
    pub async fn close_all(&self) {
        let mut idle = self.idle.lock().await;
        for mut browser in idle.drain(..) {
            if let Err(err) = browser.close().await {
                debug!("browser close failed: {err}");
            }
        }
    }
}

/// A page checked out from the pool. Releasing the lease returns the backing
/// browser to the idle list; a lease marked broken closes it instead.
pub struct PageLease {
    page: Page,
    browser: Option<Browser>,
    idle: Arc<Mutex<Vec<Browser>>>,
    page_load_timeout_secs: u64,
    broken: bool,
    _permit: OwnedSemaphorePermit,
}

impl PageLease {
    #[must_use]
    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Navigate and wait for the load event, bounded by the pool's page load
    /// timeout.
    pub async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        let timeout = Duration::from_secs(self.page_load_timeout_secs);
        let nav = async {
            self.page.goto(url).await?;
            self.page.wait_for_navigation().await?;
            Ok::<(), BrowserError>(())
        };
        match tokio::time::timeout(timeout, nav).await {
            Ok(result) => result,
            Err(_) => Err(BrowserError::NavigationTimeout {
                url: url.to_string(),
                timeout_secs: self.page_load_timeout_secs,
            }),
        }
    }

    /// Full HTML of the current document.
    pub async fn content(&self) -> Result<String, BrowserError> {
        Ok(self.page.content().await?)
    }

    /// Flag the backing browser as unusable so release closes it rather than
    /// pooling it.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }

    /// Close the page and hand the browser back (or tear it down if broken).
    pub async fn release(mut self) {
        if let Err(err) = self.page.close().await {
            debug!("page close failed: {err}");
            self.broken = true;
        }

        if let Some(mut browser) = self.browser.take() {
            if self.broken {
                if let Err(err) = browser.close().await {
                    debug!("browser close failed: {err}");
                }
            } else {
                self.idle.lock().await.push(browser);
            }
        }
    }
}
