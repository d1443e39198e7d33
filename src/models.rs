// Core data structures for the documentation hub

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

/// Version advertised for every entry of the discovery feed
pub const SWAGGER_VERSION: &str = "2.0";

/// Path prefix under which cached definitions are served
pub const SERVICE_PATH_PREFIX: &str = "/service/";

/// Separator between service name and resource name in a composite key
pub const KEY_SEPARATOR: &str = " - ";

/// Normalized identifier of one cached definition
///
/// Always uppercase. Built either from a raw string or from a
/// service name plus resource name (`"ORDERS-SERVICE - V1"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceKey(String);

impl ServiceKey {
    /// Normalize an arbitrary key
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().to_uppercase())
    }

    /// Build the composite key `{service} - {resource}`
    pub fn compose(service: &str, resource: &str) -> Self {
        Self::new(format!("{service}{KEY_SEPARATOR}{resource}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// Hash/Eq of the newtype match those of the inner String
impl Borrow<str> for ServiceKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ServiceKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Last successfully fetched descriptor for one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedDefinition {
    pub key: ServiceKey,
    /// Raw descriptor text, never deserialized by the hub
    pub text: String,
    pub updated_at: DateTime<Utc>,
}

impl CachedDefinition {
    pub fn new(key: ServiceKey, text: impl Into<String>) -> Self {
        Self {
            key,
            text: text.into(),
            updated_at: Utc::now(),
        }
    }
}

/// One row of the discovery feed handed to a documentation UI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryEntry {
    pub location: String,
    pub name: String,
    pub swagger_version: String,
}

impl DirectoryEntry {
    /// Project a cache key into its discovery entry
    pub fn for_key(key: &ServiceKey) -> Self {
        Self {
            location: format!("{SERVICE_PATH_PREFIX}{key}"),
            name: key.to_string(),
            swagger_version: SWAGGER_VERSION.to_string(),
        }
    }
}

/// A documentation resource advertised by one instance
/// (`GET {instance}/swagger-resources` element)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResourceDescriptor {
    pub location: String,
    pub swagger_version: String,
    pub name: String,
    pub url: String,
}

impl ResourceDescriptor {
    /// Relative path used to fetch the descriptor document.
    ///
    /// Older publishers only fill `location`; newer ones fill `url`.
    pub fn fetch_path(&self) -> &str {
        if self.url.is_empty() {
            &self.location
        } else {
            &self.url
        }
    }
}

/// One network instance registered under a service name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub service: String,
    pub instance_id: String,
    /// Base URL, e.g. `http://10.0.0.5:8080`
    pub uri: String,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl ServiceInstance {
    pub fn new(service: impl Into<String>, instance_id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            instance_id: instance_id.into(),
            uri: uri.into(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
