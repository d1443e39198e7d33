//! docshub - Aggregated API documentation for a service fleet
//!
//! Periodically polls every service in a fleet for its Swagger/OpenAPI
//! descriptors, keeps the last good copy of each in memory, and serves them
//! to documentation UIs from one place.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`directory`] - Fleet directory: which services and instances exist
//! - [`fetcher`] - Single-shot HTTP fetches of resource lists and descriptors
//! - [`cache`] - Concurrent in-memory definition cache
//! - [`refresh`] - Refresh engine and its fixed-delay background loop
//! - [`hub`] - HTTP server exposing the cache
//! - [`config`] - Configuration management and settings
//! - [`metrics`] - Prometheus metrics
//! - [`models`] - Core data structures and types
//! - [`utils`] - Common utilities and domain errors
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use docshub::cache::DefinitionCache;
//! use docshub::config::Config;
//! use docshub::directory::StaticFleet;
//! use docshub::fetcher::DescriptorFetcher;
//! use docshub::refresh::RefreshEngine;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let fleet = StaticFleet::from_services(&Default::default());
//!     let cache = Arc::new(DefinitionCache::new());
//!     let engine = RefreshEngine::new(
//!         Arc::new(fleet),
//!         DescriptorFetcher::from_config(&config.fetcher)?,
//!         cache.clone(),
//!         config.refresh,
//!     );
//!     engine.run_cycle().await;
//!     println!("{} definitions cached", cache.len());
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod directory;
pub mod error;
pub mod fetcher;
pub mod hub;
pub mod metrics;
pub mod models;
pub mod refresh;
pub mod utils;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::cache::DefinitionCache;
    pub use crate::config::Config;
    pub use crate::directory::{ConsulFleet, FleetDirectory, StaticFleet};
    pub use crate::error::{Error, ErrorCategory, HubErrorTrait, Result};
    pub use crate::fetcher::DescriptorFetcher;
    pub use crate::hub::HubServer;
    pub use crate::models::{DirectoryEntry, ResourceDescriptor, ServiceInstance, ServiceKey};
    pub use crate::refresh::{CycleOutcome, CycleReport, RefreshEngine};
}

// Direct re-exports for convenience
pub use models::{DirectoryEntry, ResourceDescriptor, ServiceInstance, ServiceKey};
