//! Pipeline Runner
//!
//! One ingestion run, start to finish:
//! 1. Raise process limits and wait for a healthy machine (single worker if it stays busy).
//! 2. Partition the notes document into standalone parts.
//! 3. Validate and load every part through the worker pool.
//! 4. Reconcile live boundary ids against the backup snapshot, falling back to the backup
//!    when the query service is exhausted.
//! 5. Remove the partition files.

use super::store::NoteStore;
use super::summary::RunSummary;
use super::validator::validate_partition;
use crate::config::{duration_from_secs, PipelineConfig};
use crate::executor::pool::WorkerPool;
use crate::executor::registry::UnitProcessorRegistry;
use crate::executor::types::{PoolRequest, WorkUnit};
use crate::partition::partitioner::Partitioner;
use crate::partition::types::{PartitionOutcome, PartitionRequest, PartitionSet};
use crate::query::client::RetryingClient;
use crate::query::transport::{HttpTransport, QueryTransport};
use crate::reconcile::backup::read_backup_ids;
use crate::reconcile::checker::reconcile;
use crate::reconcile::types::ReconciliationResult;
use crate::resources::monitor::ResourceMonitor;
use crate::resources::types::{LimitsOutcome, WaitOutcome, WorkloadKind};

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Name under which the partition loader is registered.
pub const LOAD_NOTES: &str = "load_notes";

/// Ids listed in the summary log line.
const ID_PREVIEW: usize = 10;

pub struct Pipeline<S, T> {
    config: PipelineConfig,
    monitor: ResourceMonitor,
    store: Arc<S>,
    client: RetryingClient<T>,
}

impl<S: NoteStore + 'static> Pipeline<S, HttpTransport> {
    /// Pipeline reading live `/proc` statistics and querying over HTTP.
    pub fn from_config(config: PipelineConfig, store: Arc<S>) -> Self {
        let monitor = ResourceMonitor::from_system(config.resources.clone());
        let client = RetryingClient::from_config(&config.query);
        Self::new(config, monitor, store, client)
    }
}

impl<S: NoteStore + 'static, T: QueryTransport> Pipeline<S, T> {
    pub fn new(
        config: PipelineConfig,
        monitor: ResourceMonitor,
        store: Arc<S>,
        client: RetryingClient<T>,
    ) -> Self {
        Self {
            config,
            monitor,
            store,
            client,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the whole pipeline on `input`, reconciling against `backup` when given.
    ///
    /// Malformed input and invalid pool arguments are errors; unit failures and query
    /// exhaustion are reported in the summary.
    pub async fn run(&self, input: &Path, backup: Option<&Path>) -> Result<RunSummary> {
        let started = Instant::now();
        let mut summary = RunSummary {
            input: input.to_path_buf(),
            tolerance: self.config.tolerance,
            ..RunSummary::default()
        };

        let limits = self.monitor.configure_system_limits();
        if limits.outcome == LimitsOutcome::Partial {
            tracing::warn!("Process limits only partially raised, continuing with defaults");
        }

        let mut workers = self.config.pool.requested_workers.max(1);
        let startup_wait = duration_from_secs(self.config.startup_wait_secs);
        if self.monitor.wait_for_resources(startup_wait).await == WaitOutcome::TimedOut {
            tracing::warn!("Machine still busy after {:?}, running serially", startup_wait);
            summary.serial_fallback = true;
            workers = 1;
        }

        match self.partition(input, workers).await? {
            PartitionOutcome::NothingToDo => {
                summary.nothing_to_do = true;
            }
            PartitionOutcome::Split(set) => {
                summary.strategy = Some(set.strategy);
                summary.partitions = set.len();
                summary.records = set.total_records;

                let loaded = self.load(&set, workers, &mut summary).await;
                if !self.config.keep_partitions {
                    if let Err(e) = set.cleanup() {
                        tracing::warn!("Failed to remove {}: {}", set.run_dir.display(), e);
                    }
                }
                loaded?;
            }
        }

        if let Some(backup) = backup {
            self.reconcile_boundaries(backup, &mut summary).await;
        }

        summary.elapsed_ms = started.elapsed().as_millis() as u64;
        tracing::info!(
            partitions = summary.partitions,
            loaded = summary.notes_loaded,
            rejected = summary.notes_rejected,
            failures = summary.unit_failures(),
            "Run finished in {} ms",
            summary.elapsed_ms
        );
        Ok(summary)
    }

    async fn partition(&self, input: &Path, workers: usize) -> Result<PartitionOutcome> {
        let partitioner = Partitioner::new(self.config.partition.clone());
        let request = PartitionRequest::new(
            self.config.partition.target_parts,
            self.config.partition.min_records_per_part,
            workers,
        );
        let input = input.to_path_buf();
        let work_dir = self.config.work_dir.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            partitioner.partition(&input, &work_dir, &request)
        })
        .await
        .context("partitioning task panicked")??;
        Ok(outcome)
    }

    /// Validates and stores every partition through the worker pool.
    async fn load(&self, set: &PartitionSet, workers: usize, summary: &mut RunSummary) -> Result<()> {
        let loaded = Arc::new(AtomicUsize::new(0));
        let rejected = Arc::new(AtomicUsize::new(0));

        let registry = UnitProcessorRegistry::new();
        {
            let store = self.store.clone();
            let markers = self.config.partition.markers();
            let (loaded, rejected) = (loaded.clone(), rejected.clone());
            let keep = self.config.keep_partitions;

            registry.register(LOAD_NOTES, move |unit: WorkUnit| {
                let store = store.clone();
                let markers = markers.clone();
                let (loaded, rejected) = (loaded.clone(), rejected.clone());

                async move {
                    let path = unit.path().context("work unit carries no partition path")?;
                    let outcome = {
                        let path = path.clone();
                        tokio::task::spawn_blocking(move || validate_partition(&path, &markers))
                            .await??
                    };

                    for record in &outcome.rejected {
                        tracing::debug!(
                            "Rejected record {} of {}: {}",
                            record.ordinal,
                            unit.label,
                            record.reason
                        );
                    }
                    let rejected_here = outcome.rejected.len();
                    let written = store.execute(outcome.notes).await?;

                    loaded.fetch_add(written, Ordering::SeqCst);
                    rejected.fetch_add(rejected_here, Ordering::SeqCst);
                    if !keep {
                        remove_partition_file(&path);
                    }
                    anyhow::Ok(())
                }
            });
        }

        let pool = WorkerPool::new(registry, self.monitor.clone(), self.config.pool.clone());
        let mut request = PoolRequest::new(
            set.run_dir.clone(),
            LOAD_NOTES,
            workers,
            WorkloadKind::MemoryIntensive.as_str(),
        );
        if let Some(secs) = self.config.deadline_secs {
            request = request.with_deadline(duration_from_secs(secs));
        }

        let units = set.partitions.iter().map(WorkUnit::for_partition).collect();
        summary.pool = pool.run(units, &request).await?;
        summary.notes_loaded = loaded.load(Ordering::SeqCst);
        summary.notes_rejected = rejected.load(Ordering::SeqCst);

        for failure in summary.pool.failed_units.iter().chain(&summary.pool.timed_out_units) {
            tracing::error!("Unit {} did not complete: {}", failure.label, failure.error);
        }
        Ok(())
    }

    /// Compares live boundary ids with the backup. Never fails the run.
    ///
    /// When the query service is exhausted the backup becomes the authoritative set and
    /// no comparison is reported.
    async fn reconcile_boundaries(&self, backup: &Path, summary: &mut RunSummary) {
        let backup_ids = match read_backup_ids(backup) {
            Ok(ids) => ids,
            Err(e) => {
                tracing::error!("Skipping reconciliation: {}", e);
                return;
            }
        };

        let live_ids = match self.client.query_ids(&self.config.query.boundary_query).await {
            Ok(ids) => ids,
            Err(e) => {
                tracing::warn!(
                    "{}; falling back to {} backup id(s), boundaries not reconciled",
                    e,
                    backup_ids.len()
                );
                summary.used_backup = true;
                summary.boundary_ids = backup_ids.len();
                return;
            }
        };
        summary.boundary_ids = live_ids.len();

        match reconcile(&live_ids, &backup_ids) {
            Ok(result) => {
                log_reconciliation(&result);
                summary.reconciliation = Some(result);
            }
            Err(e) => tracing::warn!("{}", e),
        }
    }
}

fn log_reconciliation(result: &ReconciliationResult) {
    if result.matched {
        tracing::info!("Boundaries reconciled: {}", result.summary(ID_PREVIEW));
    } else {
        tracing::warn!("Boundary data gap: {}", result.summary(ID_PREVIEW));
    }
}

fn remove_partition_file(path: &Path) {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => {
            tracing::warn!("Failed to remove {}: {}", path.display(), e);
        }
        _ => {}
    }
}
