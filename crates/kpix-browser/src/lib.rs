//! Bounded pool of headless Chrome instances for the scrape tier.
//!
//! Uses chromiumoxide (CDP) with anti-automation launch flags and stealth
//! init scripts. Pages are handed out as leases; releasing a lease returns
//! the underlying browser to an idle list for reuse.

pub mod config;
pub mod error;
pub mod human;
pub mod pool;
pub mod stealth;

pub use config::BrowserPoolConfig;
pub use error::BrowserError;
pub use human::{HumanSimulation, NoInteraction, PageInteraction};
pub use pool::{BrowserPool, PageLease};
