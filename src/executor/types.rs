use crate::config::duration_from_secs;
use crate::partition::types::Partition;
use crate::resources::types::UnknownWorkload;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Unique identifier for a work unit.
///
/// Wrapper around a UUID string, so units from different runs never collide in logs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UnitId(pub String);

impl UnitId {
    /// Generates a new random UUID v4-based UnitId.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

/// One schedulable job handed to the worker pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkUnit {
    pub id: UnitId,
    /// Stable ordinal, e.g. the partition index.
    pub index: usize,
    pub label: String,
    /// Arbitrary JSON payload passed to the unit processor.
    pub payload: serde_json::Value,
}

impl WorkUnit {
    pub fn new(index: usize, label: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: UnitId::new(),
            index,
            label: label.into(),
            payload,
        }
    }

    /// Unit processing one materialized partition.
    pub fn for_partition(partition: &Partition) -> Self {
        Self::new(
            partition.index,
            format!("partition-{:04}", partition.index),
            serde_json::json!({
                "path": partition.path,
                "index": partition.index,
                "record_count": partition.record_count,
            }),
        )
    }

    /// The `path` field of the payload, when there is one.
    pub fn path(&self) -> Option<PathBuf> {
        self.payload
            .get("path")
            .and_then(|value| value.as_str())
            .map(PathBuf::from)
    }
}

/// Lifecycle state of a unit inside one pool run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum UnitStatus {
    /// Not yet claimed by any worker.
    Pending,
    /// Claimed; `attempt` is the attempt currently executing (1-based).
    Running { attempt: usize },
    Succeeded { attempts: usize },
    /// Every attempt returned an error; `error` is the last one.
    Failed { error: String, attempts: usize },
    /// An attempt exceeded the per-unit timeout. Terminal, never retried.
    TimedOut { attempts: usize },
    /// Never started because the run deadline passed first.
    Skipped,
}

impl UnitStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, UnitStatus::Pending | UnitStatus::Running { .. })
    }
}

/// A failed or timed-out unit, as reported to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UnitFailure {
    pub id: UnitId,
    pub index: usize,
    pub label: String,
    pub attempts: usize,
    pub error: String,
}

/// Aggregated outcome of one `WorkerPool::run`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PoolReport {
    pub succeeded: usize,
    pub failed: usize,
    pub timed_out: usize,
    pub skipped: usize,
    pub failed_units: Vec<UnitFailure>,
    pub timed_out_units: Vec<UnitFailure>,
    pub skipped_units: Vec<UnitId>,
    /// Worker count after resource adjustment.
    pub effective_workers: usize,
    /// Workers actually started; lower than `effective_workers` when pacing stopped early.
    pub spawned_workers: usize,
    pub elapsed_ms: u64,
}

impl PoolReport {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed + self.timed_out + self.skipped
    }

    /// No unit failed, timed out or was skipped.
    pub fn is_clean(&self) -> bool {
        self.failed == 0 && self.timed_out == 0 && self.skipped == 0
    }
}

/// Bad pool invocation. Raised before any worker starts.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("source location {} does not exist", .0.display())]
    MissingSource(PathBuf),
    #[error("no unit processor registered as '{0}'")]
    UnknownProcessor(String),
    #[error(transparent)]
    UnknownWorkload(#[from] UnknownWorkload),
    #[error("at least one worker must be requested")]
    NoWorkers,
}

/// Worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    pub requested_workers: usize,
    /// Pause between two worker spawns, before resource adjustment.
    pub spawn_delay_secs: f64,
    pub unit_timeout_secs: f64,
    /// Attempts per unit, the first one included.
    pub max_attempts: usize,
    pub retry_delay_secs: f64,
    /// Longest wait for resources before a later spawn; on timeout no more workers start.
    pub resource_wait_secs: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            requested_workers: 4,
            spawn_delay_secs: 1.0,
            unit_timeout_secs: 300.0,
            max_attempts: 3,
            retry_delay_secs: 2.0,
            resource_wait_secs: 30.0,
        }
    }
}

impl PoolConfig {
    pub fn spawn_delay(&self) -> Duration {
        secs(self.spawn_delay_secs)
    }

    pub fn unit_timeout(&self) -> Duration {
        secs(self.unit_timeout_secs)
    }

    pub fn retry_delay(&self) -> Duration {
        secs(self.retry_delay_secs)
    }

    pub fn resource_wait(&self) -> Duration {
        secs(self.resource_wait_secs)
    }
}

fn secs(value: f64) -> Duration {
    duration_from_secs(value)
}

/// Arguments of one `WorkerPool::run`.
#[derive(Debug, Clone)]
pub struct PoolRequest {
    /// Location the units read from; must exist.
    pub source: PathBuf,
    /// Name of a registered unit processor.
    pub processor: String,
    pub requested_workers: usize,
    /// Workload kind name, e.g. `generic`, `memory_intensive` or `network`.
    pub workload: String,
    /// Overall time budget; units not started within it are skipped.
    pub deadline: Option<Duration>,
}

impl PoolRequest {
    pub fn new(
        source: impl Into<PathBuf>,
        processor: impl Into<String>,
        requested_workers: usize,
        workload: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            processor: processor.into(),
            requested_workers,
            workload: workload.into(),
            deadline: None,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }
}
