//! Refresh engine
//!
//! One cycle walks the whole fleet:
//!
//! ```text
//! service_names() ──┬─> instances(a) ─> first ─> list_resources ──┬─> fetch v1 ─> cache
//!                   │                                            └─> fetch v2 ─> cache
//!                   ├─> instances(b) ─> (none) ─> skip
//!                   └─> ...
//! ```
//!
//! Services fan out concurrently, and so do the resources of one service.
//! Every branch is isolated: a directory error, an unreachable instance or a
//! broken descriptor is logged and only ends its own branch. A failed fetch
//! never touches the cache, so the last good descriptor keeps being served.
//!
//! Cycles never overlap on one engine. [`RefreshEngine::run_cycle`] returns
//! [`CycleOutcome::Skipped`] if another cycle is still running, and the
//! background loop started by [`RefreshEngine::spawn`] waits the configured
//! interval after the end of each cycle before starting the next one.

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

use crate::cache::DefinitionCache;
use crate::config::RefreshConfig;
use crate::directory::FleetDirectory;
use crate::fetcher::DescriptorFetcher;
use crate::metrics;
use crate::models::{ResourceDescriptor, ServiceInstance, ServiceKey};

// ============================================================================
// Cycle Results
// ============================================================================

/// Summary of one completed cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Service names returned by the directory
    pub services_seen: usize,
    /// Services whose instance listed at least one resource
    pub services_refreshed: usize,
    /// Services skipped (directory error, no instances, no resources)
    pub services_skipped: usize,
    /// Descriptors written to the cache
    pub resources_fetched: usize,
    /// Descriptors that could not be fetched
    pub resources_failed: usize,
}

/// Result of asking the engine to run a cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// The cycle ran to the end
    Completed(CycleReport),
    /// Another cycle was still running, nothing was done
    Skipped,
}

impl CycleOutcome {
    pub fn report(&self) -> Option<&CycleReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped => None,
        }
    }
}

/// Why a service contributed nothing to a cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SkipReason {
    DirectoryError,
    NoInstances,
    NoResources,
}

impl SkipReason {
    fn as_str(&self) -> &'static str {
        match self {
            Self::DirectoryError => "directory_error",
            Self::NoInstances => "no_instances",
            Self::NoResources => "no_resources",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServiceOutcome {
    Refreshed { fetched: usize, failed: usize },
    Skipped(SkipReason),
}

/// Clears the running flag when a cycle ends, is dropped, or panics
struct RunningGuard<'a>(&'a AtomicBool);

impl<'a> RunningGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ============================================================================
// Refresh Engine
// ============================================================================

/// Polls the fleet and keeps the definition cache up to date
pub struct RefreshEngine {
    directory: Arc<dyn FleetDirectory>,
    fetcher: DescriptorFetcher,
    cache: Arc<DefinitionCache>,
    config: RefreshConfig,
    running: AtomicBool,
    cycles_completed: AtomicU64,
    last_report: RwLock<Option<CycleReport>>,
}

impl RefreshEngine {
    pub fn new(
        directory: Arc<dyn FleetDirectory>,
        fetcher: DescriptorFetcher,
        cache: Arc<DefinitionCache>,
        config: RefreshConfig,
    ) -> Self {
        Self {
            directory,
            fetcher,
            cache,
            config,
            running: AtomicBool::new(false),
            cycles_completed: AtomicU64::new(0),
            last_report: RwLock::new(None),
        }
    }

    /// The cache this engine writes into
    pub fn cache(&self) -> Arc<DefinitionCache> {
        self.cache.clone()
    }

    /// Whether a cycle is in flight
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Number of cycles that ran to the end
    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    /// Report of the most recent completed cycle
    pub async fn last_report(&self) -> Option<CycleReport> {
        self.last_report.read().await.clone()
    }

    /// Run one refresh cycle across the whole fleet
    pub async fn run_cycle(&self) -> CycleOutcome {
        let Some(_guard) = RunningGuard::acquire(&self.running) else {
            tracing::warn!("Refresh cycle still running, skipping this tick");
            metrics::record_cycle("skipped", None);
            return CycleOutcome::Skipped;
        };

        let started_at = Utc::now();
        let start = Instant::now();
        tracing::debug!("Starting service definition refresh");

        let mut report = CycleReport {
            started_at,
            ..CycleReport::default()
        };

        let names = match self.directory.service_names().await {
            Ok(names) => names,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list services, ending cycle");
                Vec::new()
            }
        };
        report.services_seen = names.len();

        let outcomes: Vec<ServiceOutcome> = stream::iter(names)
            .map(|name| async move { self.refresh_service(&name).await })
            .buffer_unordered(self.config.max_concurrent_services.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                ServiceOutcome::Refreshed { fetched, failed } => {
                    report.services_refreshed += 1;
                    report.resources_fetched += fetched;
                    report.resources_failed += failed;
                }
                ServiceOutcome::Skipped(reason) => {
                    report.services_skipped += 1;
                    metrics::record_service_skipped(reason.as_str());
                }
            }
        }

        let elapsed = start.elapsed();
        report.duration_ms = elapsed.as_millis() as u64;

        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
        metrics::record_cycle("completed", Some(elapsed.as_secs_f64()));
        metrics::set_cached_definitions(self.cache.len());

        tracing::info!(
            services = report.services_seen,
            refreshed = report.services_refreshed,
            skipped = report.services_skipped,
            fetched = report.resources_fetched,
            failed = report.resources_failed,
            duration_ms = report.duration_ms,
            "Service definition refresh complete"
        );

        *self.last_report.write().await = Some(report.clone());
        CycleOutcome::Completed(report)
    }

    async fn refresh_service(&self, service: &str) -> ServiceOutcome {
        tracing::debug!(service = %service, "Refreshing service definitions");

        let instances = match self.directory.instances(service).await {
            Ok(instances) => instances,
            Err(e) => {
                tracing::warn!(service = %service, error = %e, "Failed to list instances, skipping service");
                return ServiceOutcome::Skipped(SkipReason::DirectoryError);
            }
        };

        // Instances of one service are assumed to publish the same docs
        let Some(instance) = instances.into_iter().next() else {
            tracing::info!(service = %service, "No instances available, skipping service");
            return ServiceOutcome::Skipped(SkipReason::NoInstances);
        };

        let resources = self.fetcher.list_resources(&instance).await;
        if resources.is_empty() {
            tracing::info!(
                service = %service,
                instance = %instance.instance_id,
                "Instance exposes no documentation resources, skipping service"
            );
            return ServiceOutcome::Skipped(SkipReason::NoResources);
        }

        let instance = &instance;
        let results: Vec<bool> = stream::iter(resources)
            .map(|resource| async move { self.refresh_resource(service, instance, &resource).await })
            .buffer_unordered(self.config.max_concurrent_resources.max(1))
            .collect()
            .await;

        let fetched = results.iter().filter(|ok| **ok).count();
        ServiceOutcome::Refreshed {
            fetched,
            failed: results.len() - fetched,
        }
    }

    async fn refresh_resource(
        &self,
        service: &str,
        instance: &ServiceInstance,
        resource: &ResourceDescriptor,
    ) -> bool {
        tracing::debug!(
            service = %service,
            resource = %resource.name,
            path = %resource.fetch_path(),
            "Fetching service definition"
        );

        match self
            .fetcher
            .fetch_descriptor(&instance.uri, resource.fetch_path())
            .await
        {
            Ok(text) => {
                let key = ServiceKey::compose(service, &resource.name);
                self.cache.put(&key, text);
                metrics::record_fetch(true);
                true
            }
            Err(e) => {
                // previous value for this key, if any, stays cached
                tracing::error!(
                    service = %service,
                    resource = %resource.name,
                    instance = %instance.instance_id,
                    error = %e,
                    "Could not fetch service definition, keeping last known value"
                );
                metrics::record_fetch(false);
                false
            }
        }
    }

    /// Start the background refresh loop.
    ///
    /// The first cycle runs after `initial_delay`; each following cycle starts
    /// `interval` after the previous one ended. Sending `true` on (or
    /// dropping the sender of) `shutdown` stops the loop; an in-flight cycle
    /// is abandoned and its partial writes stay in the cache.
    pub fn spawn(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::info!(
                interval_secs = self.config.interval_secs,
                "Starting service definition refresh loop"
            );

            if !wait_or_shutdown(self.config.initial_delay(), &mut shutdown).await {
                return;
            }

            loop {
                tokio::select! {
                    _ = self.run_cycle() => {}
                    _ = shutdown_requested(&mut shutdown) => {
                        tracing::info!("Shutdown requested, abandoning in-flight refresh cycle");
                        break;
                    }
                }

                if !wait_or_shutdown(self.config.interval(), &mut shutdown).await {
                    break;
                }
            }

            tracing::info!("Service definition refresh loop stopped");
        })
    }
}

/// Sleep for `delay`; false if shutdown was requested first
async fn wait_or_shutdown(delay: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return false;
    }

    tokio::select! {
        _ = tokio::time::sleep(delay) => true,
        _ = shutdown_requested(shutdown) => false,
    }
}

/// Resolves once shutdown is signalled or the sender is gone
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
