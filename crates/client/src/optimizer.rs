//! Background cache optimizer.
//!
//! Runs off the request path on a fixed interval. Each cycle purges expired
//! entries from every store and logs hit rate, item counts, low-confidence
//! counts and scheduler health.
//!
//! ```ignore
//! let handle = BackgroundOptimizer::new(service.maintenance_targets(), Duration::from_secs(3600), 0.75).start();
//! // ...
//! handle.stop().await;
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use visarag_core::cache::{CacheMaintenance, CacheStats};

use crate::scheduler::{Scheduler, SchedulerStats};

/// What the optimizer looks after.
#[derive(Clone, Default)]
pub struct MaintenanceTargets {
    pub stores: Vec<Arc<dyn CacheMaintenance>>,
    pub schedulers: Vec<Scheduler>,
}

impl std::fmt::Debug for MaintenanceTargets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaintenanceTargets")
            .field("stores", &self.stores.iter().map(|s| s.name().to_string()).collect::<Vec<_>>())
            .field("schedulers", &self.schedulers.iter().map(|s| s.name().to_string()).collect::<Vec<_>>())
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StoreReport {
    pub name: String,
    pub purged: usize,
    pub low_confidence: usize,
    pub stats: CacheStats,
}

/// Result of one optimization cycle.
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationReport {
    pub total_purged: usize,
    pub stores: Vec<StoreReport>,
    pub schedulers: Vec<SchedulerStats>,
}

#[derive(Debug, Clone)]
pub struct BackgroundOptimizer {
    targets: MaintenanceTargets,
    interval: Duration,
    low_confidence_threshold: f32,
}

impl BackgroundOptimizer {
    /// A zero interval is raised to one second.
    pub fn new(targets: MaintenanceTargets, interval: Duration, low_confidence_threshold: f32) -> Self {
        Self { targets, interval: interval.max(Duration::from_secs(1)), low_confidence_threshold }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run one cycle now.
    pub fn perform_optimization(&self) -> OptimizationReport {
        let start = Instant::now();
        let mut stores = Vec::with_capacity(self.targets.stores.len());

        for store in &self.targets.stores {
            let purged = store.purge_expired();
            let low_confidence = store.low_confidence_entries(self.low_confidence_threshold).len();
            let stats = store.stats();
            tracing::info!(
                store = store.name(),
                purged,
                items = stats.item_count,
                capacity = stats.capacity,
                hit_rate = stats.hit_rate,
                evictions = stats.evictions,
                low_confidence,
                "cache health"
            );
            stores.push(StoreReport { name: store.name().to_string(), purged, low_confidence, stats });
        }

        let schedulers: Vec<SchedulerStats> = self.targets.schedulers.iter().map(Scheduler::stats).collect();
        for stats in &schedulers {
            tracing::info!(
                scheduler = %stats.name,
                admitted = stats.admitted,
                dropped = stats.dropped,
                retried = stats.retried,
                failed = stats.failed,
                queued = stats.queued,
                in_flight = stats.in_flight,
                available_tokens = stats.available_tokens,
                "scheduler health"
            );
        }

        let total_purged = stores.iter().map(|s| s.purged).sum();
        tracing::info!(total_purged, elapsed_ms = start.elapsed().as_millis() as u64, "optimization cycle finished");
        OptimizationReport { total_purged, stores, schedulers }
    }

    /// Spawn the recurring task. The first cycle runs one interval from now.
    pub fn start(self) -> OptimizerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::info!(interval_secs = self.interval.as_secs(), "background optimizer started");

            let mut cycles = 0u64;
            loop {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                    _ = ticker.tick() => {
                        self.perform_optimization();
                        cycles += 1;
                    }
                }
            }

            tracing::info!(cycles, "background optimizer stopped");
            cycles
        });

        OptimizerHandle { shutdown: shutdown_tx, task }
    }
}

/// Handle to a running optimizer.
#[derive(Debug)]
pub struct OptimizerHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<u64>,
}

impl OptimizerHandle {
    /// Signal shutdown and wait for the task. Returns the number of cycles run.
    pub async fn stop(self) -> u64 {
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(cycles) => cycles,
            Err(err) => {
                tracing::warn!(error = %err, "background optimizer task failed");
                0
            }
        }
    }
}
