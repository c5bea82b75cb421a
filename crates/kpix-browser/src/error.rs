use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("no Chrome/Chromium executable found; install chromium or set KPIX_CHROME_PATH")]
    ChromeNotFound,

    #[error("browser launch failed: {0}")]
    Launch(String),

    #[error("CDP error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("page navigation timed out after {timeout_secs}s for {url}")]
    NavigationTimeout { url: String, timeout_secs: u64 },
}
