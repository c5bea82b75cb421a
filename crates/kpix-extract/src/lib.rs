//! Tiered KPI extraction for social profiles.
//!
//! Each platform is tried in order: official API, browser scrape, heuristic
//! estimate. The [`hybrid::HybridOrchestrator`] drives the flow and folds
//! every tier failure into the returned snapshot instead of erroring out.

pub mod api;
pub mod bootstrap;
pub mod descriptor;
pub mod error;
pub mod estimate;
pub mod extractor;
pub mod hybrid;
pub mod parse;
pub mod rate_limit;
pub mod retry;
pub mod scrape;
pub mod validator;

pub use api::ApiTier;
pub use bootstrap::ExtractionService;
pub use descriptor::{descriptor, PlatformDescriptor};
pub use error::ExtractError;
pub use extractor::{Extractor, PlatformExtractor};
pub use hybrid::{HybridOrchestrator, OrchestratorConfig};
pub use rate_limit::{PlatformLimiters, TokenBucket};
pub use retry::RetryPolicy;
pub use scrape::ScrapeTier;
pub use validator::{run_validation, ValidationReport};
