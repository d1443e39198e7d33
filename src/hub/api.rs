//! REST API handlers for the documentation hub

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;

use crate::metrics;
use crate::models::DirectoryEntry;
use crate::refresh::CycleReport;

use super::server::AppState;

// ============================================================================
// API Response Types
// ============================================================================

/// Generic API response wrapper
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub cached_definitions: usize,
    pub cycles_completed: u64,
    pub refresh_running: bool,
    pub last_cycle: Option<CycleReport>,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Documentation endpoints
        .route("/service/{key}", get(get_definition))
        .route("/swagger-resources", get(list_definitions))
        // Operational endpoints
        .route("/api/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

// ============================================================================
// Documentation Handlers
// ============================================================================

/// Cached descriptor for one key, matched exactly against the stored key
async fn get_definition(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.cache.get(&key) {
        Some(text) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            text,
        )
            .into_response(),
        None => {
            tracing::debug!(key = %key, "Definition not cached");
            StatusCode::NOT_FOUND.into_response()
        }
    }
}

/// Discovery feed consumed by the documentation UI
async fn list_definitions(State(state): State<AppState>) -> Json<Vec<DirectoryEntry>> {
    Json(state.cache.list_all())
}

// ============================================================================
// Operational Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime,
        cached_definitions: state.cache.len(),
        cycles_completed: state.engine.cycles_completed(),
        refresh_running: state.engine.is_running(),
        last_cycle: state.engine.last_report().await,
    }))
}

/// Prometheus scrape endpoint
async fn metrics_handler() -> Response {
    match metrics::encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        )
            .into_response(),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to encode metrics: {e}"),
        )
            .into_response(),
    }
}

// ============================================================================
// Tests
// ============================================================================
