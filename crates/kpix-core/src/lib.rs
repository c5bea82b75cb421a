//! Shared configuration and data models for the KPIX social KPI extractor.

pub mod app_config;
pub mod config;
pub mod models;
pub mod proxy;

pub use app_config::{
    AppConfig, CacheBackendKind, Environment, PlatformCredentials, SimulationLevel,
};
pub use config::{build_app_config, load_app_config, load_app_config_from_env};
pub use models::{
    engagement_rate, EngagementMetrics, ExtractionMethod, Platform, ProfileKpi, UnknownPlatform,
};
pub use proxy::{ProxyRotation, ProxySelector};
