//! Worker Pool Implementation
//!
//! Runs a batch of `WorkUnit`s with a resource-sized set of tokio workers.
//!
//! ## Responsibilities
//! - **Validation**: source, processor and workload kind are checked before anything starts.
//! - **Sizing & pacing**: the worker count comes from `ResourceMonitor::adjust_workers`;
//!   spawns are spaced by `adjust_process_delay` and stop when resources stay constrained.
//! - **Execution**: each worker pulls the next unit from the shared `UnitQueue`; every
//!   attempt runs in its own task under the per-unit timeout.
//! - **Isolation**: a failing, panicking or hanging unit never affects its siblings.

use super::queue::UnitQueue;
use super::registry::{UnitProcessorFn, UnitProcessorRegistry};
use super::types::*;
use crate::resources::monitor::ResourceMonitor;
use crate::resources::types::{CheckMode, ResourceStatus, WaitOutcome, WorkloadKind};
use crate::retry::{retry_with_backoff, Attempt, RetryPolicy};

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Why one attempt did not succeed.
#[derive(Debug)]
enum UnitError {
    Failed(String),
    TimedOut,
}

/// Everything a worker needs, shared by all workers of one run.
struct WorkerContext {
    queue: Arc<UnitQueue>,
    processor: UnitProcessorFn,
    policy: RetryPolicy,
    unit_timeout: Duration,
    deadline: Option<Instant>,
}

impl WorkerContext {
    fn past_deadline(&self) -> bool {
        past(self.deadline)
    }
}

pub struct WorkerPool {
    registry: Arc<UnitProcessorRegistry>,
    monitor: ResourceMonitor,
    config: PoolConfig,
}

impl WorkerPool {
    pub fn new(
        registry: Arc<UnitProcessorRegistry>,
        monitor: ResourceMonitor,
        config: PoolConfig,
    ) -> Self {
        Self {
            registry,
            monitor,
            config,
        }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Checks every precondition of `run` and resolves the processor and workload kind.
    pub fn validate(
        &self,
        request: &PoolRequest,
    ) -> Result<(UnitProcessorFn, WorkloadKind), ValidationError> {
        if !request.source.exists() {
            return Err(ValidationError::MissingSource(request.source.clone()));
        }
        let processor = self
            .registry
            .get(&request.processor)
            .ok_or_else(|| ValidationError::UnknownProcessor(request.processor.clone()))?;
        let kind: WorkloadKind = request.workload.parse()?;
        if request.requested_workers == 0 {
            return Err(ValidationError::NoWorkers);
        }
        Ok((processor, kind))
    }

    /// Runs every unit and aggregates the outcomes.
    ///
    /// Only a `ValidationError` is returned as an error; unit failures, timeouts and
    /// skips are counted in the report.
    pub async fn run(
        &self,
        units: Vec<WorkUnit>,
        request: &PoolRequest,
    ) -> Result<PoolReport, ValidationError> {
        let (processor, kind) = self.validate(request)?;
        let started = Instant::now();

        if units.is_empty() {
            tracing::debug!("No work units, nothing to run");
            return Ok(PoolReport::default());
        }

        let effective = self
            .monitor
            .adjust_workers(request.requested_workers, kind)
            .min(units.len());
        let delay = self.monitor.adjust_process_delay(self.config.spawn_delay());

        let context = Arc::new(WorkerContext {
            queue: Arc::new(UnitQueue::new(units)),
            processor,
            policy: RetryPolicy::fixed(self.config.max_attempts, self.config.retry_delay()),
            unit_timeout: self.config.unit_timeout(),
            deadline: request.deadline.and_then(|budget| started.checked_add(budget)),
        });

        tracing::info!(
            units = context.queue.len(),
            workers = effective,
            workload = %kind,
            "Starting worker pool with processor '{}'",
            request.processor
        );

        let mut handles = Vec::with_capacity(effective);
        for worker_id in 0..effective {
            if worker_id > 0 && !self.pace_next_spawn(&context, delay).await {
                break;
            }

            let context = context.clone();
            handles.push(tokio::spawn(async move {
                worker_loop(worker_id, context).await;
            }));
        }
        let spawned = handles.len();

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::error!("Worker task ended abnormally: {}", e);
            }
        }

        let skipped = context.queue.skip_remaining();
        if !skipped.is_empty() {
            tracing::warn!("Deadline reached, {} unit(s) never started", skipped.len());
        }

        let mut report = build_report(&context.queue);
        report.effective_workers = effective;
        report.spawned_workers = spawned;
        report.elapsed_ms = started.elapsed().as_millis() as u64;

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            timed_out = report.timed_out,
            skipped = report.skipped,
            "Worker pool finished in {} ms",
            report.elapsed_ms
        );
        Ok(report)
    }

    /// Waits before starting another worker. Returns `false` when no more workers
    /// should start.
    async fn pace_next_spawn(&self, context: &WorkerContext, delay: Duration) -> bool {
        if context.queue.remaining() == 0 || context.past_deadline() {
            return false;
        }

        if !delay.is_zero() {
            tokio::time::sleep(bounded(delay, context.deadline)).await;
            if context.past_deadline() {
                return false;
            }
        }

        if self.monitor.check_resources(CheckMode::Normal) == ResourceStatus::Constrained {
            let wait = bounded(self.config.resource_wait(), context.deadline);
            if self.monitor.wait_for_resources(wait).await == WaitOutcome::TimedOut {
                tracing::warn!("Resources constrained, not starting more workers");
                return false;
            }
        }
        true
    }
}

/// Pulls units until the queue is drained or the deadline passes.
async fn worker_loop(worker_id: usize, context: Arc<WorkerContext>) {
    tracing::debug!("Worker {} started", worker_id);

    loop {
        if context.past_deadline() {
            tracing::debug!("Worker {} stopping at deadline", worker_id);
            break;
        }
        let Some(unit) = context.queue.try_claim() else {
            break;
        };

        tracing::debug!("Worker {} claimed unit {}", worker_id, unit.label);
        let status = run_unit(&context, &unit).await;
        context.queue.set_status(&unit.id, status);
    }

    tracing::debug!("Worker {} finished", worker_id);
}

/// Runs one unit through the retry policy and returns its terminal status.
async fn run_unit(context: &WorkerContext, unit: &WorkUnit) -> UnitStatus {
    let outcome = retry_with_backoff(&context.policy, |attempt| {
        let unit = unit.clone();
        let processor = context.processor.clone();
        let queue = context.queue.clone();
        let timeout = context.unit_timeout;

        async move {
            queue.set_status(&unit.id, UnitStatus::Running { attempt });
            let label = unit.label.clone();

            // Own task per attempt: a panic becomes a JoinError and a timeout can abort it
            let mut handle = tokio::spawn(processor(unit));
            match tokio::time::timeout(timeout, &mut handle).await {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(e))) => {
                    tracing::warn!("Unit {} attempt {} failed: {:#}", label, attempt, e);
                    Err(Attempt::Retry(UnitError::Failed(format!("{:#}", e))))
                }
                Ok(Err(join_error)) => {
                    tracing::warn!("Unit {} attempt {} panicked", label, attempt);
                    Err(Attempt::Retry(UnitError::Failed(format!(
                        "processor panicked: {}",
                        join_error
                    ))))
                }
                Err(_) => {
                    handle.abort();
                    tracing::warn!("Unit {} timed out after {:?}", label, timeout);
                    Err(Attempt::Abort(UnitError::TimedOut))
                }
            }
        }
    })
    .await;

    match outcome {
        Ok(((), attempts)) => UnitStatus::Succeeded { attempts },
        Err(failure) => match failure.last_error {
            UnitError::TimedOut => UnitStatus::TimedOut {
                attempts: failure.attempts,
            },
            UnitError::Failed(error) => UnitStatus::Failed {
                error,
                attempts: failure.attempts,
            },
        },
    }
}

fn build_report(queue: &UnitQueue) -> PoolReport {
    let mut report = PoolReport::default();

    for (unit, status) in queue.snapshot() {
        let failure = |attempts: usize, error: String| UnitFailure {
            id: unit.id.clone(),
            index: unit.index,
            label: unit.label.clone(),
            attempts,
            error,
        };

        match status {
            UnitStatus::Succeeded { .. } => report.succeeded += 1,
            UnitStatus::Failed { error, attempts } => {
                report.failed += 1;
                report.failed_units.push(failure(attempts, error));
            }
            UnitStatus::TimedOut { attempts } => {
                report.timed_out += 1;
                report
                    .timed_out_units
                    .push(failure(attempts, "timed out".to_string()));
            }
            UnitStatus::Skipped | UnitStatus::Pending | UnitStatus::Running { .. } => {
                report.skipped += 1;
                report.skipped_units.push(unit.id.clone());
            }
        }
    }
    report
}

fn past(deadline: Option<Instant>) -> bool {
    deadline.is_some_and(|deadline| Instant::now() >= deadline)
}

/// `wait`, shortened so it never runs past `deadline`.
fn bounded(wait: Duration, deadline: Option<Instant>) -> Duration {
    match deadline {
        Some(deadline) => wait.min(deadline.saturating_duration_since(Instant::now())),
        None => wait,
    }
}
