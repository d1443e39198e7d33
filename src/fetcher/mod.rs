//! Descriptor fetcher for service instances
//!
//! Two single-shot calls against one instance:
//! - `GET {instance}/swagger-resources` lists the documentation resources
//! - `GET {instance}{resource.url}` returns one descriptor document
//!
//! Neither call retries. The refresh loop's next cycle is the only retry, and
//! every request is bounded by the client timeout so a hung instance only
//! stalls its own branch.

use reqwest::{header, Client};
use serde::de::IgnoredAny;
use std::collections::BTreeSet;
use std::time::Duration;

use crate::config::FetcherConfig;
use crate::models::{ResourceDescriptor, ServiceInstance};
use crate::utils::error::FetchError;
use crate::utils::join_url;

/// Well-known path listing an instance's documentation resources
pub const RESOURCES_PATH: &str = "/swagger-resources";

/// Stateless HTTP fetcher for documentation descriptors
#[derive(Debug, Clone)]
pub struct DescriptorFetcher {
    /// HTTP client with configured timeout
    client: Client,

    /// Relative path of the resource listing
    resources_path: String,
}

impl DescriptorFetcher {
    /// Create a fetcher with the given per-request timeout
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Self::build_client(timeout, &FetcherConfig::default().user_agent)?;

        Ok(Self {
            client,
            resources_path: RESOURCES_PATH.to_string(),
        })
    }

    /// Create a fetcher from configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn from_config(config: &FetcherConfig) -> Result<Self, FetchError> {
        let client = Self::build_client(config.request_timeout(), &config.user_agent)?;

        Ok(Self {
            client,
            resources_path: config.resources_path.clone(),
        })
    }

    fn build_client(timeout: Duration, user_agent: &str) -> Result<Client, FetchError> {
        Ok(Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .gzip(true)
            .build()?)
    }

    /// List the documentation resources an instance exposes.
    ///
    /// Never fails: transport errors, timeouts, non-success statuses and
    /// undecodable bodies are logged and yield an empty list. Duplicate
    /// entries are collapsed.
    pub async fn list_resources(&self, instance: &ServiceInstance) -> Vec<ResourceDescriptor> {
        match self.try_list_resources(&instance.uri).await {
            Ok(resources) => resources,
            Err(e) => {
                tracing::error!(
                    service = %instance.service,
                    instance = %instance.instance_id,
                    uri = %instance.uri,
                    error = %e,
                    "Failed to list documentation resources"
                );
                Vec::new()
            }
        }
    }

    /// Fallible form of [`Self::list_resources`]
    pub async fn try_list_resources(&self, base_uri: &str) -> Result<Vec<ResourceDescriptor>, FetchError> {
        let url = join_url(base_uri, &self.resources_path)?;
        tracing::debug!(url = %url, "Listing documentation resources");

        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::from_request(e, url.as_str()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_request(e, url.as_str()))?;
        let listed: Vec<ResourceDescriptor> = serde_json::from_slice(&bytes)?;

        let unique: BTreeSet<ResourceDescriptor> = listed.into_iter().collect();
        Ok(unique.into_iter().collect())
    }

    /// Fetch one descriptor document as text
    ///
    /// # Errors
    ///
    /// Returns `FetchError` on transport failure, timeout, non-success
    /// status, or a body that is not JSON
    pub async fn fetch_descriptor(&self, base_uri: &str, resource_url: &str) -> Result<String, FetchError> {
        let url = join_url(base_uri, resource_url)?;
        tracing::debug!(url = %url, "Fetching descriptor");

        let response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::from_request(e, url.as_str()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::from_request(e, url.as_str()))?;

        Self::render(&bytes)
    }

    /// Check that a body is a JSON document and return it as text.
    ///
    /// The payload is kept byte-for-byte (key order included); only
    /// surrounding whitespace is trimmed.
    pub fn render(body: &[u8]) -> Result<String, FetchError> {
        serde_json::from_slice::<IgnoredAny>(body)?;
        // valid JSON is valid UTF-8, so this conversion is lossless
        Ok(String::from_utf8_lossy(body).trim().to_string())
    }
}
