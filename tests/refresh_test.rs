//! End-to-end tests for the refresh engine against mock instances

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use docshub::directory::{FleetDirectory, StaticFleet};
use docshub::models::ServiceInstance;
use docshub::refresh::CycleOutcome;
use docshub::utils::error::DirectoryError;
use serde_json::json;
use tokio::sync::watch;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{engine_for, engine_with_timeout, instance, mount_descriptor, mount_resources};

/// Services {A, B}: A publishes v1, B has no instances
#[tokio::test]
async fn test_single_cycle_caches_live_services_only() {
    let server_a = MockServer::start().await;
    mount_resources(&server_a, &[("v1", "/v2/api-docs")]).await;
    mount_descriptor(&server_a, "/v2/api-docs", r#"{"a":1}"#).await;

    let fleet = StaticFleet::from_services(&BTreeMap::from([
        ("A".to_string(), vec![server_a.uri()]),
        ("B".to_string(), vec![]),
    ]));
    let (engine, cache) = engine_for(fleet);

    let outcome = engine.run_cycle().await;
    let report = outcome.report().expect("cycle should complete");

    assert_eq!(report.services_seen, 2);
    assert_eq!(report.services_refreshed, 1);
    assert_eq!(report.services_skipped, 1);
    assert_eq!(report.resources_fetched, 1);

    assert_eq!(cache.get("A - V1").as_deref(), Some(r#"{"a":1}"#));
    let listing = cache.list_all();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].name, "A - V1");
    assert!(listing.iter().all(|e| !e.name.starts_with("B")));
}

/// Keys combine service and resource name, uppercased
#[tokio::test]
async fn test_keys_are_composed_and_normalized() {
    let server = MockServer::start().await;
    mount_resources(&server, &[("v1", "/v2/api-docs"), ("internal", "/internal/api-docs")]).await;
    mount_descriptor(&server, "/v2/api-docs", r#"{"public":true}"#).await;
    mount_descriptor(&server, "/internal/api-docs", r#"{"public":false}"#).await;

    let fleet = StaticFleet::new();
    fleet.register(instance("orders-service", &server));
    let (engine, cache) = engine_for(fleet);

    engine.run_cycle().await;

    let names: Vec<String> = cache.list_all().into_iter().map(|e| e.name).collect();
    assert_eq!(names, vec!["ORDERS-SERVICE - INTERNAL", "ORDERS-SERVICE - V1"]);
    assert_eq!(
        cache.get("ORDERS-SERVICE - V1").as_deref(),
        Some(r#"{"public":true}"#)
    );
}

/// A descriptor that changes between cycles is overwritten
#[tokio::test]
async fn test_second_cycle_overwrites() {
    let server = MockServer::start().await;
    mount_resources(&server, &[("v1", "/v2/api-docs")]).await;

    Mock::given(method("GET"))
        .and(path("/v2/api-docs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":1}"#))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/api-docs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":2}"#))
        .mount(&server)
        .await;

    let fleet = StaticFleet::new();
    fleet.register(instance("A", &server));
    let (engine, cache) = engine_for(fleet);

    engine.run_cycle().await;
    assert_eq!(cache.get("A - V1").as_deref(), Some(r#"{"a":1}"#));

    engine.run_cycle().await;
    assert_eq!(cache.get("A - V1").as_deref(), Some(r#"{"a":2}"#));
    assert_eq!(cache.len(), 1);
    assert_eq!(engine.cycles_completed(), 2);
}

/// A failed refresh keeps serving the last good descriptor
#[tokio::test]
async fn test_failed_fetch_keeps_stale_value() {
    let server = MockServer::start().await;
    mount_resources(&server, &[("v1", "/v2/api-docs")]).await;

    Mock::given(method("GET"))
        .and(path("/v2/api-docs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":1}"#))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/api-docs"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fleet = StaticFleet::new();
    fleet.register(instance("A", &server));
    let (engine, cache) = engine_for(fleet);

    engine.run_cycle().await;
    let outcome = engine.run_cycle().await;

    assert_eq!(outcome.report().unwrap().resources_failed, 1);
    assert_eq!(cache.get("A - V1").as_deref(), Some(r#"{"a":1}"#));
}

/// A service that disappears keeps its last known descriptor
#[tokio::test]
async fn test_departed_service_is_not_evicted() {
    let server = MockServer::start().await;
    mount_resources(&server, &[("v1", "/v2/api-docs")]).await;
    mount_descriptor(&server, "/v2/api-docs", r#"{"a":1}"#).await;

    let fleet = Arc::new(StaticFleet::new());
    fleet.register(instance("A", &server));

    let cache = Arc::new(docshub::cache::DefinitionCache::new());
    let engine = docshub::refresh::RefreshEngine::new(
        fleet.clone(),
        docshub::fetcher::DescriptorFetcher::new(Duration::from_secs(5)).unwrap(),
        cache.clone(),
        common::test_refresh_config(),
    );

    engine.run_cycle().await;
    fleet.remove_service("A");
    let outcome = engine.run_cycle().await;

    assert_eq!(outcome.report().unwrap().services_seen, 0);
    assert_eq!(cache.get("A - V1").as_deref(), Some(r#"{"a":1}"#));
}

/// A key that never fetched successfully stays absent
#[tokio::test]
async fn test_never_cached_stays_absent() {
    let server = MockServer::start().await;
    mount_resources(&server, &[("v1", "/v2/api-docs")]).await;

    Mock::given(method("GET"))
        .and(path("/v2/api-docs"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let fleet = StaticFleet::new();
    fleet.register(instance("A", &server));
    let (engine, cache) = engine_for(fleet);

    let outcome = engine.run_cycle().await;

    assert_eq!(outcome.report().unwrap().resources_failed, 1);
    assert!(cache.get("A - V1").is_none());
    assert!(cache.list_all().is_empty());
}

/// One resource failing does not affect its siblings
#[tokio::test]
async fn test_partial_resource_failure() {
    let server = MockServer::start().await;
    mount_resources(&server, &[("v1", "/v1/api-docs"), ("v2", "/v2/api-docs")]).await;
    mount_descriptor(&server, "/v1/api-docs", r#"{"v":1}"#).await;
    mount_descriptor(&server, "/v2/api-docs", "not json").await;

    let fleet = StaticFleet::new();
    fleet.register(instance("A", &server));
    let (engine, cache) = engine_for(fleet);

    let outcome = engine.run_cycle().await;
    let report = outcome.report().unwrap();

    assert_eq!(report.resources_fetched, 1);
    assert_eq!(report.resources_failed, 1);
    assert!(cache.get("A - V1").is_some());
    assert!(cache.get("A - V2").is_none());
}

/// An unreachable or hung instance does not block other services
#[tokio::test]
async fn test_fault_isolation() {
    let healthy = MockServer::start().await;
    mount_resources(&healthy, &[("v1", "/v2/api-docs")]).await;
    mount_descriptor(&healthy, "/v2/api-docs", r#"{"ok":true}"#).await;

    let hung = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/swagger-resources"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(10)))
        .mount(&hung)
        .await;

    let fleet = StaticFleet::new();
    fleet.register(instance("healthy", &healthy));
    fleet.register(ServiceInstance::new("down", "down-1", "http://127.0.0.1:1"));
    fleet.register(instance("hung", &hung));
    let (engine, cache) = engine_with_timeout(fleet, Duration::from_millis(300));

    let start = Instant::now();
    let outcome = engine.run_cycle().await;
    let report = outcome.report().unwrap();

    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(report.services_seen, 3);
    assert_eq!(report.services_refreshed, 1);
    assert_eq!(report.services_skipped, 2);
    assert_eq!(cache.get("HEALTHY - V1").as_deref(), Some(r#"{"ok":true}"#));
}

/// Only the first registered instance is polled
#[tokio::test]
async fn test_first_instance_is_representative() {
    let first = MockServer::start().await;
    mount_resources(&first, &[("v1", "/v2/api-docs")]).await;
    mount_descriptor(&first, "/v2/api-docs", r#"{"from":"first"}"#).await;

    let second = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&second)
        .await;

    let fleet = StaticFleet::new();
    fleet.register(ServiceInstance::new("A", "a-1", first.uri()));
    fleet.register(ServiceInstance::new("A", "a-2", second.uri()));
    let (engine, cache) = engine_for(fleet);

    engine.run_cycle().await;

    assert_eq!(cache.get("A - V1").as_deref(), Some(r#"{"from":"first"}"#));
}

/// Resources that only advertise `location` are still fetched
#[tokio::test]
async fn test_resource_location_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/swagger-resources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "name": "legacy", "location": "/api-docs", "swaggerVersion": "1.2" }
        ])))
        .mount(&server)
        .await;
    mount_descriptor(&server, "/api-docs", r#"{"legacy":true}"#).await;

    let fleet = StaticFleet::new();
    fleet.register(instance("A", &server));
    let (engine, cache) = engine_for(fleet);

    engine.run_cycle().await;

    assert_eq!(cache.get("A - LEGACY").as_deref(), Some(r#"{"legacy":true}"#));
}

/// An instance with an empty resource list contributes nothing
#[tokio::test]
async fn test_empty_resource_list_is_skipped() {
    let server = MockServer::start().await;
    mount_resources(&server, &[]).await;

    let fleet = StaticFleet::new();
    fleet.register(instance("A", &server));
    let (engine, cache) = engine_for(fleet);

    let outcome = engine.run_cycle().await;

    assert_eq!(outcome.report().unwrap().services_skipped, 1);
    assert!(cache.is_empty());
}

/// Directory whose instance lookups fail for one service
struct FlakyDirectory {
    inner: StaticFleet,
    broken: &'static str,
}

#[async_trait]
impl FleetDirectory for FlakyDirectory {
    async fn service_names(&self) -> Result<Vec<String>, DirectoryError> {
        self.inner.service_names().await
    }

    async fn instances(&self, service: &str) -> Result<Vec<ServiceInstance>, DirectoryError> {
        if service == self.broken {
            return Err(DirectoryError::Decode("registry hiccup".to_string()));
        }
        self.inner.instances(service).await
    }
}

/// A directory error for one service skips only that service
#[tokio::test]
async fn test_directory_error_is_isolated() {
    let server = MockServer::start().await;
    mount_resources(&server, &[("v1", "/v2/api-docs")]).await;
    mount_descriptor(&server, "/v2/api-docs", r#"{"a":1}"#).await;

    let inner = StaticFleet::new();
    inner.register(instance("A", &server));
    inner.register(instance("B", &server));
    let directory = FlakyDirectory { inner, broken: "B" };

    let cache = Arc::new(docshub::cache::DefinitionCache::new());
    let engine = docshub::refresh::RefreshEngine::new(
        Arc::new(directory),
        docshub::fetcher::DescriptorFetcher::new(Duration::from_secs(5)).unwrap(),
        cache.clone(),
        common::test_refresh_config(),
    );

    let outcome = engine.run_cycle().await;
    let report = outcome.report().unwrap();

    assert_eq!(report.services_skipped, 1);
    assert!(cache.get("A - V1").is_some());
    assert!(cache.get("B - V1").is_none());
}

/// A cycle requested while another is running is skipped without fetching
#[tokio::test]
async fn test_overlapping_cycle_is_skipped() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/swagger-resources"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(common::resources_body(&[("v1", "/v2/api-docs")]))
                .set_delay(Duration::from_millis(500)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/api-docs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":1}"#))
        .expect(1)
        .mount(&server)
        .await;

    let fleet = StaticFleet::new();
    fleet.register(instance("A", &server));
    let (engine, cache) = engine_for(fleet);
    let engine = Arc::new(engine);

    let running = tokio::spawn({
        let engine = engine.clone();
        async move { engine.run_cycle().await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(engine.is_running());
    assert_eq!(engine.run_cycle().await, CycleOutcome::Skipped);

    let first = running.await.unwrap();
    assert!(matches!(first, CycleOutcome::Completed(_)));
    assert!(!engine.is_running());
    assert_eq!(engine.cycles_completed(), 1);
    assert!(cache.get("A - V1").is_some());
}

/// The background loop keeps refreshing until shutdown
#[tokio::test]
async fn test_background_loop_refreshes_periodically() {
    let server = MockServer::start().await;
    mount_resources(&server, &[("v1", "/v2/api-docs")]).await;

    Mock::given(method("GET"))
        .and(path("/v2/api-docs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":1}"#))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v2/api-docs"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"a":2}"#))
        .mount(&server)
        .await;

    let fleet = StaticFleet::new();
    fleet.register(instance("A", &server));
    let (engine, cache) = engine_for(fleet);
    let engine = Arc::new(engine);

    let (tx, rx) = watch::channel(false);
    let handle = engine.clone().spawn(rx);

    let deadline = Instant::now() + Duration::from_secs(10);
    while engine.cycles_completed() < 2 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    assert!(engine.cycles_completed() >= 2);
    assert_eq!(cache.get("A - V1").as_deref(), Some(r#"{"a":2}"#));

    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop should stop on shutdown")
        .unwrap();
}
