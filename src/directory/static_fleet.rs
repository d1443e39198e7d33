//! In-memory fleet registry

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;

use super::FleetDirectory;
use crate::models::ServiceInstance;
use crate::utils::error::DirectoryError;

/// Fleet held in memory, keyed by service name.
///
/// Registration order is preserved per service, so the first registered
/// instance is the one the refresh loop polls.
#[derive(Debug, Default)]
pub struct StaticFleet {
    services: DashMap<String, Vec<ServiceInstance>>,
}

impl StaticFleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a `name -> [base uri]` map; instance ids are `{name}-{n}`
    pub fn from_services(services: &BTreeMap<String, Vec<String>>) -> Self {
        let fleet = Self::new();
        for (name, uris) in services {
            // declared with no instances: still a known service
            fleet.services.entry(name.clone()).or_default();
            for (index, uri) in uris.iter().enumerate() {
                fleet.register(ServiceInstance::new(name, format!("{name}-{index}"), uri));
            }
        }
        fleet
    }

    /// Register or update an instance (matched by instance id)
    pub fn register(&self, instance: ServiceInstance) {
        let mut instances = self.services.entry(instance.service.clone()).or_default();
        if let Some(pos) = instances
            .iter()
            .position(|i| i.instance_id == instance.instance_id)
        {
            instances[pos] = instance;
        } else {
            instances.push(instance);
        }
    }

    /// Remove one instance; the service name stays known
    pub fn deregister(&self, service: &str, instance_id: &str) -> Option<ServiceInstance> {
        let mut instances = self.services.get_mut(service)?;
        let pos = instances.iter().position(|i| i.instance_id == instance_id)?;
        Some(instances.remove(pos))
    }

    /// Forget a service and all its instances
    pub fn remove_service(&self, service: &str) -> Option<Vec<ServiceInstance>> {
        self.services.remove(service).map(|(_, instances)| instances)
    }

    /// Total registered instances across all services
    pub fn instance_count(&self) -> usize {
        self.services.iter().map(|entry| entry.value().len()).sum()
    }
}

#[async_trait]
impl FleetDirectory for StaticFleet {
    async fn service_names(&self) -> Result<Vec<String>, DirectoryError> {
        let mut names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        Ok(names)
    }

    async fn instances(&self, service: &str) -> Result<Vec<ServiceInstance>, DirectoryError> {
        Ok(self
            .services
            .get(service)
            .map(|instances| instances.clone())
            .unwrap_or_default())
    }
}
