//! Fleet directory: where services and their instances are discovered
//!
//! The refresh loop only needs two questions answered, each asked fresh on
//! every cycle:
//! - which logical services exist right now
//! - which network instances are registered under one of them
//!
//! Two backends ship with the crate:
//! - [`StaticFleet`] - an in-memory registry, filled from config or at runtime
//! - [`ConsulFleet`] - a client for a Consul-compatible catalog

pub mod consul;
pub mod static_fleet;

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::DirectoryConfig;
use crate::models::ServiceInstance;
use crate::utils::error::DirectoryError;

pub use consul::ConsulFleet;
pub use static_fleet::StaticFleet;

/// Source of live service names and instances
#[async_trait]
pub trait FleetDirectory: Send + Sync {
    /// All logical service names currently known
    async fn service_names(&self) -> Result<Vec<String>, DirectoryError>;

    /// Instances currently registered under `service`
    async fn instances(&self, service: &str) -> Result<Vec<ServiceInstance>, DirectoryError>;
}

/// Build the directory backend described by configuration
pub fn from_config(
    config: &DirectoryConfig,
    timeout: std::time::Duration,
) -> Result<Arc<dyn FleetDirectory>, DirectoryError> {
    match config {
        DirectoryConfig::Static { services } => Ok(Arc::new(StaticFleet::from_services(services))),
        DirectoryConfig::Consul { url, scheme } => {
            Ok(Arc::new(ConsulFleet::new(url, scheme, timeout)?))
        }
    }
}
