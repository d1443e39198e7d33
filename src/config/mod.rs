//! Configuration management for the documentation hub
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Every section has defaults, so a file only needs
//! the values it changes:
//!
//! ```toml
//! [refresh]
//! interval_secs = 15
//!
//! [directory]
//! kind = "static"
//!
//! [directory.services]
//! orders = ["http://10.0.0.5:8080", "http://10.0.0.6:8080"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Refresh loop configuration
    pub refresh: RefreshConfig,

    /// Descriptor fetcher configuration
    pub fetcher: FetcherConfig,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Where the fleet of services is discovered
    pub directory: DirectoryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Refresh loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshConfig {
    /// Delay between the end of one cycle and the start of the next
    pub interval_secs: u64,

    /// Delay before the first cycle
    pub initial_delay_secs: u64,

    /// Services refreshed concurrently within one cycle
    pub max_concurrent_services: usize,

    /// Resources fetched concurrently within one service
    pub max_concurrent_resources: usize,
}

/// Descriptor fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetcherConfig {
    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// User agent string
    pub user_agent: String,

    /// Path of the resource listing on each instance
    pub resources_path: String,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Enable CORS for the documentation UI
    pub enable_cors: bool,

    /// Enable request logging
    pub enable_request_logging: bool,
}

/// Fleet directory backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DirectoryConfig {
    /// Fixed fleet: service name to instance base URIs
    Static {
        #[serde(default)]
        services: BTreeMap<String, Vec<String>>,
    },

    /// Consul-compatible catalog
    Consul {
        /// Catalog base URL, e.g. `http://localhost:8500`
        url: String,

        /// Scheme used to reach the registered instances
        #[serde(default = "default_instance_scheme")]
        scheme: String,
    },
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

fn default_instance_scheme() -> String {
    String::from("http")
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30,
            initial_delay_secs: 0,
            max_concurrent_services: 8,
            max_concurrent_resources: 4,
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 10,
            user_agent: format!("docshub/{}", env!("CARGO_PKG_VERSION")),
            resources_path: String::from(crate::fetcher::RESOURCES_PATH),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self::Static {
            services: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

impl RefreshConfig {
    /// Get refresh interval as Duration
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Get initial delay as Duration
    #[must_use]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_secs(self.initial_delay_secs)
    }
}

impl FetcherConfig {
    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let interval_secs = env_parse("DOCSHUB_REFRESH_INTERVAL_SECS")?
            .unwrap_or(defaults.refresh.interval_secs);
        let initial_delay_secs = env_parse("DOCSHUB_REFRESH_INITIAL_DELAY_SECS")?
            .unwrap_or(defaults.refresh.initial_delay_secs);
        let max_concurrent_services = env_parse("DOCSHUB_MAX_CONCURRENT_SERVICES")?
            .unwrap_or(defaults.refresh.max_concurrent_services);
        let max_concurrent_resources = env_parse("DOCSHUB_MAX_CONCURRENT_RESOURCES")?
            .unwrap_or(defaults.refresh.max_concurrent_resources);

        let request_timeout_secs = env_parse("DOCSHUB_REQUEST_TIMEOUT_SECS")?
            .unwrap_or(defaults.fetcher.request_timeout_secs);
        let user_agent =
            std::env::var("DOCSHUB_USER_AGENT").unwrap_or(defaults.fetcher.user_agent);
        let resources_path =
            std::env::var("DOCSHUB_RESOURCES_PATH").unwrap_or(defaults.fetcher.resources_path);

        let bind_address = env_parse("DOCSHUB_BIND_ADDRESS")?
            .unwrap_or(defaults.server.bind_address);

        let directory = match std::env::var("DOCSHUB_CONSUL_URL") {
            Ok(url) => DirectoryConfig::Consul {
                url,
                scheme: std::env::var("DOCSHUB_CONSUL_INSTANCE_SCHEME")
                    .unwrap_or_else(|_| default_instance_scheme()),
            },
            Err(_) => DirectoryConfig::Static {
                services: match std::env::var("DOCSHUB_STATIC_SERVICES") {
                    Ok(raw) => parse_static_services(&raw)?,
                    Err(_) => BTreeMap::new(),
                },
            },
        };

        let level = std::env::var("DOCSHUB_LOG_LEVEL").unwrap_or(defaults.logging.level);
        let format = std::env::var("DOCSHUB_LOG_FORMAT").unwrap_or(defaults.logging.format);

        Ok(Self {
            refresh: RefreshConfig {
                interval_secs,
                initial_delay_secs,
                max_concurrent_services,
                max_concurrent_resources,
            },
            fetcher: FetcherConfig {
                request_timeout_secs,
                user_agent,
                resources_path,
            },
            server: ServerConfig {
                bind_address,
                ..defaults.server
            },
            directory,
            logging: LoggingConfig { level, format },
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from `path` if given, otherwise from the environment, then validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_env()?,
        };
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.refresh.interval_secs == 0 {
            anyhow::bail!("refresh.interval_secs must be greater than 0");
        }

        if self.refresh.max_concurrent_services == 0 {
            anyhow::bail!("refresh.max_concurrent_services must be greater than 0");
        }

        if self.refresh.max_concurrent_resources == 0 {
            anyhow::bail!("refresh.max_concurrent_resources must be greater than 0");
        }

        if self.fetcher.request_timeout_secs == 0 {
            anyhow::bail!("fetcher.request_timeout_secs must be greater than 0");
        }

        if !self.fetcher.resources_path.starts_with('/') {
            anyhow::bail!("fetcher.resources_path must start with '/'");
        }

        match &self.directory {
            DirectoryConfig::Consul { url, scheme } => {
                if url.trim().is_empty() {
                    anyhow::bail!("directory.url must not be empty");
                }
                if scheme != "http" && scheme != "https" {
                    anyhow::bail!("directory.scheme must be 'http' or 'https'");
                }
            }
            DirectoryConfig::Static { services } => {
                if let Some((name, _)) = services.iter().find(|(name, _)| name.trim().is_empty()) {
                    anyhow::bail!("directory.services contains an empty service name: {name:?}");
                }
            }
        }

        Ok(())
    }
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .with_context(|| format!("Invalid value for {name}: {raw}")),
        Err(_) => Ok(None),
    }
}

/// Parse `name=uri,uri;name=uri` into a static fleet
pub fn parse_static_services(raw: &str) -> Result<BTreeMap<String, Vec<String>>> {
    let mut services = BTreeMap::new();

    for entry in raw.split(';').map(str::trim).filter(|e| !e.is_empty()) {
        let (name, uris) = entry
            .split_once('=')
            .with_context(|| format!("Expected name=uri[,uri...] but got: {entry}"))?;

        let uris: Vec<String> = uris
            .split(',')
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from)
            .collect();

        services
            .entry(name.trim().to_string())
            .or_insert_with(Vec::new)
            .extend(uris);
    }

    Ok(services)
}
