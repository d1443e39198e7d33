//! Common test utilities

use std::sync::Arc;
use std::time::Duration;

use docshub::cache::DefinitionCache;
use docshub::config::RefreshConfig;
use docshub::directory::StaticFleet;
use docshub::fetcher::DescriptorFetcher;
use docshub::models::ServiceInstance;
use docshub::refresh::RefreshEngine;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Resource listing body as published by a springfox-style instance
#[allow(dead_code)]
pub fn resources_body(resources: &[(&str, &str)]) -> serde_json::Value {
    json!(resources
        .iter()
        .map(|(name, url)| json!({
            "name": name,
            "url": url,
            "location": url,
            "swaggerVersion": "2.0",
        }))
        .collect::<Vec<_>>())
}

/// Mount `GET /swagger-resources` listing `resources`
#[allow(dead_code)]
pub async fn mount_resources(server: &MockServer, resources: &[(&str, &str)]) {
    Mock::given(method("GET"))
        .and(path("/swagger-resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(resources_body(resources)))
        .mount(server)
        .await;
}

/// Mount `GET {url}` returning `body`
#[allow(dead_code)]
pub async fn mount_descriptor(server: &MockServer, url: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(url))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Refresh settings for tests: no initial delay, short interval
#[allow(dead_code)]
pub fn test_refresh_config() -> RefreshConfig {
    RefreshConfig {
        interval_secs: 1,
        initial_delay_secs: 0,
        ..RefreshConfig::default()
    }
}

/// Engine over `fleet` with a fetch timeout of `timeout`
#[allow(dead_code)]
pub fn engine_with_timeout(fleet: StaticFleet, timeout: Duration) -> (RefreshEngine, Arc<DefinitionCache>) {
    let cache = Arc::new(DefinitionCache::new());
    let engine = RefreshEngine::new(
        Arc::new(fleet),
        DescriptorFetcher::new(timeout).unwrap(),
        cache.clone(),
        test_refresh_config(),
    );
    (engine, cache)
}

/// Engine over `fleet` with a generous fetch timeout
#[allow(dead_code)]
pub fn engine_for(fleet: StaticFleet) -> (RefreshEngine, Arc<DefinitionCache>) {
    engine_with_timeout(fleet, Duration::from_secs(5))
}

/// Single-instance fleet entry pointing at a mock server
#[allow(dead_code)]
pub fn instance(service: &str, server: &MockServer) -> ServiceInstance {
    ServiceInstance::new(service, format!("{service}-1"), server.uri())
}
