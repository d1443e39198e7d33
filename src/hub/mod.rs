//! Documentation hub HTTP server
//!
//! Serves the definition cache to documentation UIs and runs the refresh loop
//! in the background.
//!
//! # Endpoints
//!
//! - `GET /service/{key}` - cached descriptor text, 404 if never fetched
//! - `GET /swagger-resources` - discovery feed of every cached definition
//! - `GET /api/health` - liveness plus last refresh report
//! - `GET /metrics` - Prometheus text exposition
//!
//! # Example
//!
//! ```no_run
//! use docshub::config::Config;
//! use docshub::hub::HubServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let server = HubServer::new(Config::default())?;
//!     server.start_with_shutdown(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     }).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod server;

pub use api::{create_router, ApiResponse, HealthResponse};
pub use server::{AppState, HubServer, ServerError, ServerInfo};
