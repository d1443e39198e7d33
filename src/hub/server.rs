//! Hub server implementation
//!
//! Wires the fleet directory, fetcher, cache and refresh engine together and
//! serves the cache over HTTP.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::cache::DefinitionCache;
use crate::config::{Config, ServerConfig};
use crate::directory::{self, FleetDirectory};
use crate::fetcher::DescriptorFetcher;
use crate::refresh::RefreshEngine;

use super::api::create_router;

// ============================================================================
// App State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Definition cache read by every handler
    pub cache: Arc<DefinitionCache>,

    /// Refresh engine writing into the cache
    pub engine: Arc<RefreshEngine>,

    /// Server start time
    pub start_time: Instant,

    /// Configuration
    pub config: ServerConfig,
}

// ============================================================================
// Hub Server
// ============================================================================

/// Documentation hub server
pub struct HubServer {
    config: Config,
    state: AppState,
}

impl HubServer {
    /// Create a server whose fleet directory is described by `config`
    pub fn new(config: Config) -> Result<Self, ServerError> {
        let directory =
            directory::from_config(&config.directory, config.fetcher.request_timeout())
                .map_err(|e| ServerError::InitError(e.to_string()))?;

        Self::with_directory(config, directory)
    }

    /// Create a server over an already built fleet directory
    pub fn with_directory(
        config: Config,
        directory: Arc<dyn FleetDirectory>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|e| ServerError::ConfigError(e.to_string()))?;

        let fetcher = DescriptorFetcher::from_config(&config.fetcher)
            .map_err(|e| ServerError::InitError(e.to_string()))?;

        let cache = Arc::new(DefinitionCache::new());
        let engine = Arc::new(RefreshEngine::new(
            directory,
            fetcher,
            cache.clone(),
            config.refresh.clone(),
        ));

        let state = AppState {
            cache,
            engine,
            start_time: Instant::now(),
            config: config.server.clone(),
        };

        Ok(Self { config, state })
    }

    /// Get the application state
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the router with all routes
    pub fn build_router(&self) -> Router {
        let mut router = create_router(self.state.clone());

        // Documentation UIs are usually served from another origin
        if self.config.server.enable_cors {
            router = router.layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            );
        }

        if self.config.server.enable_request_logging {
            router = router.layer(TraceLayer::new_for_http());
        }

        router
    }

    /// Bind the configured address and serve until `shutdown_signal` resolves
    pub async fn start_with_shutdown(
        &self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let addr = self.config.server.bind_address;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(format!("{addr}: {e}")))?;

        self.serve(listener, shutdown_signal).await
    }

    /// Serve on an already bound listener.
    ///
    /// The refresh loop runs for as long as the server does and is stopped
    /// once the HTTP side has drained.
    pub async fn serve(
        &self,
        listener: TcpListener,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let router = self.build_router();
        let addr = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(e.to_string()))?;

        tracing::info!(%addr, "Starting documentation hub (with graceful shutdown)");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let refresh = self.state.engine.clone().spawn(shutdown_rx);

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| ServerError::ServeError(e.to_string()));

        let _ = shutdown_tx.send(true);
        if let Err(e) = refresh.await {
            tracing::warn!(error = %e, "Refresh loop ended abnormally");
        }

        served?;
        tracing::info!("Documentation hub shutdown complete");
        Ok(())
    }

    /// Get server info
    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            bind_address: self.config.server.bind_address,
            refresh_interval_secs: self.config.refresh.interval_secs,
            request_timeout_secs: self.config.fetcher.request_timeout_secs,
            cors_enabled: self.config.server.enable_cors,
            request_logging_enabled: self.config.server.enable_request_logging,
        }
    }
}

/// Server information
#[derive(Debug, Clone)]
pub struct ServerInfo {
    pub bind_address: SocketAddr,
    pub refresh_interval_secs: u64,
    pub request_timeout_secs: u64,
    pub cors_enabled: bool,
    pub request_logging_enabled: bool,
}

impl ServerInfo {
    /// Format as display string
    pub fn display(&self) -> String {
        format!(
            "Documentation Hub\n\
             {:-<40}\n\
             Bind Address: {}\n\
             Refresh Interval: {}s\n\
             Request Timeout: {}s\n\
             CORS: {}\n\
             Request Logging: {}",
            "",
            self.bind_address,
            self.refresh_interval_secs,
            self.request_timeout_secs,
            if self.cors_enabled { "enabled" } else { "disabled" },
            if self.request_logging_enabled { "enabled" } else { "disabled" }
        )
    }
}

// ============================================================================
// Server Errors
// ============================================================================

/// Server errors
#[derive(Debug, Clone)]
pub enum ServerError {
    /// Configuration error
    ConfigError(String),

    /// Initialization error
    InitError(String),

    /// Failed to bind to address
    BindError(String),

    /// Server error
    ServeError(String),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            Self::InitError(msg) => write!(f, "Initialization error: {}", msg),
            Self::BindError(msg) => write!(f, "Failed to bind: {}", msg),
            Self::ServeError(msg) => write!(f, "Server error: {}", msg),
        }
    }
}

impl std::error::Error for ServerError {}

// ============================================================================
// Tests
// ============================================================================
