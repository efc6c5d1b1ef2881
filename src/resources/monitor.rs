//! Resource Monitor
//!
//! Turns fresh `ResourceSample`s into scheduling answers for the worker pool.

use crate::config::duration_from_secs;

use super::limits::configure_limits;
use super::system::{ProcStats, SystemStats};
use super::types::*;

use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Clone)]
pub struct ResourceMonitor {
    stats: Arc<dyn SystemStats>,
    config: ResourceConfig,
}

impl ResourceMonitor {
    pub fn new(stats: Arc<dyn SystemStats>, config: ResourceConfig) -> Self {
        Self { stats, config }
    }

    /// Monitor reading the live `/proc` statistics.
    pub fn from_system(config: ResourceConfig) -> Self {
        Self::new(Arc::new(ProcStats), config)
    }

    pub fn config(&self) -> &ResourceConfig {
        &self.config
    }

    fn sample(&self) -> Option<ResourceSample> {
        match self.stats.sample() {
            Ok(sample) => Some(sample),
            Err(e) => {
                tracing::debug!("Resource sample unavailable: {}", e);
                None
            }
        }
    }

    /// Non-blocking health check.
    ///
    /// When no reading is possible the answer is `Available`; scheduling then falls back
    /// to the configured worker counts.
    pub fn check_resources(&self, mode: CheckMode) -> ResourceStatus {
        let Some(sample) = self.sample() else {
            return ResourceStatus::Available;
        };

        let (min_memory, max_load) = match mode {
            CheckMode::Normal => (self.config.min_memory_percent, self.config.max_load_per_cpu),
            CheckMode::Minimal => (
                self.config.minimal_memory_percent,
                self.config.minimal_load_per_cpu,
            ),
        };

        if sample.memory_available_percent < min_memory {
            tracing::debug!(
                "Memory constrained: {:.1}% available (< {:.1}%)",
                sample.memory_available_percent,
                min_memory
            );
            return ResourceStatus::Constrained;
        }

        if sample.load_per_cpu() > max_load {
            tracing::debug!(
                "Load constrained: {:.2} per CPU (> {:.2})",
                sample.load_per_cpu(),
                max_load
            );
            return ResourceStatus::Constrained;
        }

        ResourceStatus::Available
    }

    /// Polls `check_resources(Normal)` every poll interval until it reports `Available`
    /// or `timeout` elapses. A zero timeout checks exactly once.
    pub async fn wait_for_resources(&self, timeout: Duration) -> WaitOutcome {
        let deadline = Instant::now() + timeout;
        let poll = self.config.poll_interval();

        loop {
            if self.check_resources(CheckMode::Normal) == ResourceStatus::Available {
                return WaitOutcome::Ready;
            }

            let now = Instant::now();
            if now >= deadline {
                tracing::warn!("Resources still constrained after {:?}", timeout);
                return WaitOutcome::TimedOut;
            }

            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }

    /// Effective worker count for `requested` workers of the given kind.
    ///
    /// Low memory halves the count, high load caps it at the CPU count, then the kind's
    /// safety margin is subtracted. The result is always in `[1, requested]` and never
    /// decreases as `requested` grows.
    pub fn adjust_workers(&self, requested: usize, kind: WorkloadKind) -> usize {
        let requested = requested.max(1);
        let mut workers = requested;

        if let Some(sample) = self.sample() {
            if sample.memory_available_percent < self.config.min_memory_percent {
                workers = workers.div_ceil(2);
            }
            if sample.load_per_cpu() > self.config.max_load_per_cpu {
                workers = workers.min(sample.cpu_count.max(1));
            }
        }

        let margin = match kind {
            WorkloadKind::MemoryIntensive => self.config.memory_intensive_margin.max(2),
            WorkloadKind::Generic | WorkloadKind::Network => self.config.generic_margin.max(1),
        };
        let effective = workers.saturating_sub(margin).max(1);

        if effective != requested {
            tracing::info!(
                requested = requested,
                effective = effective,
                workload = %kind,
                "Adjusted worker count"
            );
        }
        effective
    }

    /// Effective pause between worker spawns.
    ///
    /// Clamped to `[0, max_delay]`. Delays above the low threshold are stretched by half
    /// while the machine is constrained.
    pub fn adjust_process_delay(&self, configured: Duration) -> Duration {
        let max = duration_from_secs(self.config.max_delay_secs);
        let low = duration_from_secs(self.config.low_delay_threshold_secs);

        if configured <= low {
            return configured.min(max);
        }

        let delay = if self.check_resources(CheckMode::Normal) == ResourceStatus::Constrained {
            configured.saturating_add(configured / 2)
        } else {
            configured
        };
        delay.min(max)
    }

    /// Raises process and file-descriptor limits where permitted.
    pub fn configure_system_limits(&self) -> LimitsReport {
        configure_limits(self.config.target_open_files, self.config.target_processes)
    }
}
