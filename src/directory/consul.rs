//! Consul catalog client
//!
//! Reads the fleet from a Consul-compatible HTTP catalog:
//! - `GET /v1/catalog/services` returns `{ "name": ["tag", ...] }`
//! - `GET /v1/catalog/service/{name}` returns the registered nodes

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use url::Url;

use super::FleetDirectory;
use crate::models::ServiceInstance;
use crate::utils::error::DirectoryError;

/// Consul registers itself as a service; it never publishes API docs
const CONSUL_SELF_SERVICE: &str = "consul";

/// One node of `GET /v1/catalog/service/{name}`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CatalogService {
    #[serde(rename = "ServiceID")]
    pub service_id: String,
    pub service_name: String,
    #[serde(default)]
    pub service_address: String,
    pub service_port: u16,
    #[serde(default)]
    pub service_tags: Option<Vec<String>>,
    #[serde(default)]
    pub service_meta: Option<BTreeMap<String, String>>,
    /// Node address, used when the service registered without one
    #[serde(default)]
    pub address: String,
}

impl CatalogService {
    /// Convert into a fleet instance reachable over `scheme`
    pub fn into_instance(self, scheme: &str) -> ServiceInstance {
        let host = if self.service_address.is_empty() {
            &self.address
        } else {
            &self.service_address
        };
        let uri = format!("{scheme}://{host}:{}", self.service_port);

        let mut instance = ServiceInstance::new(self.service_name, self.service_id, uri);
        if let Some(meta) = self.service_meta {
            instance.metadata.extend(meta);
        }
        if let Some(tags) = self.service_tags.filter(|t| !t.is_empty()) {
            instance.metadata.insert("tags".to_string(), tags.join(","));
        }
        instance
    }
}

/// Fleet directory backed by a Consul catalog
#[derive(Debug, Clone)]
pub struct ConsulFleet {
    client: Client,
    base_url: Url,
    scheme: String,
}

impl ConsulFleet {
    /// Create a client for the catalog at `base_url`
    pub fn new(base_url: &str, scheme: &str, timeout: Duration) -> Result<Self, DirectoryError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DirectoryError::InvalidUrl(format!("{base_url}: {e}")))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            scheme: scheme.to_string(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, DirectoryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DirectoryError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, DirectoryError> {
        let response = self.client.get(url.clone()).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| DirectoryError::Decode(e.to_string()))
    }
}

#[async_trait]
impl FleetDirectory for ConsulFleet {
    async fn service_names(&self) -> Result<Vec<String>, DirectoryError> {
        let url = self.endpoint(&["v1", "catalog", "services"])?;
        let services: HashMap<String, Option<Vec<String>>> = self.get_json(url).await?;

        let mut names: Vec<String> = services
            .into_keys()
            .filter(|name| name != CONSUL_SELF_SERVICE)
            .collect();
        names.sort();
        Ok(names)
    }

    async fn instances(&self, service: &str) -> Result<Vec<ServiceInstance>, DirectoryError> {
        let url = self.endpoint(&["v1", "catalog", "service", service])?;
        let nodes: Vec<CatalogService> = self.get_json(url).await?;

        Ok(nodes
            .into_iter()
            .map(|node| node.into_instance(&self.scheme))
            .collect())
    }
}
