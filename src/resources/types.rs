use crate::config::duration_from_secs;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Point-in-time reading of machine health.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceSample {
    /// Available memory as a percentage of total memory (0-100).
    pub memory_available_percent: f64,
    /// One-minute load average.
    pub load_average: f64,
    pub cpu_count: usize,
}

impl ResourceSample {
    pub fn load_per_cpu(&self) -> f64 {
        self.load_average / self.cpu_count.max(1) as f64
    }
}

/// Strictness of a resource check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMode {
    Normal,
    /// Relaxed thresholds for a coarse go/no-go before a small job.
    Minimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceStatus {
    Available,
    Constrained,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    Ready,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitsOutcome {
    Applied,
    Partial,
}

/// What `configure_system_limits` managed to do.
#[derive(Debug, Clone, Serialize)]
pub struct LimitsReport {
    pub outcome: LimitsOutcome,
    /// Soft open-file limit after the attempt, if it could be read.
    pub open_files: Option<u64>,
    /// Soft process limit after the attempt, if it could be read.
    pub processes: Option<u64>,
}

/// The kind of work a pool invocation runs; decides the worker safety margin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
    Generic,
    /// Units hold large documents in memory (partition parsing and loading).
    MemoryIntensive,
    /// Units mostly wait on the network (external queries).
    Network,
}

impl WorkloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadKind::Generic => "generic",
            WorkloadKind::MemoryIntensive => "memory_intensive",
            WorkloadKind::Network => "network",
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown workload kind '{0}'")]
pub struct UnknownWorkload(pub String);

impl FromStr for WorkloadKind {
    type Err = UnknownWorkload;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "generic" => Ok(WorkloadKind::Generic),
            "memory_intensive" | "memory-intensive" | "xml" => Ok(WorkloadKind::MemoryIntensive),
            "network" => Ok(WorkloadKind::Network),
            _ => Err(UnknownWorkload(s.to_string())),
        }
    }
}

/// Thresholds and pacing settings for `ResourceMonitor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceConfig {
    /// Below this available-memory percentage the machine is constrained.
    pub min_memory_percent: f64,
    /// Above this load per CPU the machine is constrained.
    pub max_load_per_cpu: f64,
    pub minimal_memory_percent: f64,
    pub minimal_load_per_cpu: f64,
    pub poll_interval_secs: f64,
    /// Spawn delays at or below this pass through unchanged.
    pub low_delay_threshold_secs: f64,
    pub max_delay_secs: f64,
    pub memory_intensive_margin: usize,
    pub generic_margin: usize,
    pub target_open_files: u64,
    pub target_processes: u64,
}

impl Default for ResourceConfig {
    fn default() -> Self {
        Self {
            min_memory_percent: 20.0,
            max_load_per_cpu: 2.0,
            minimal_memory_percent: 10.0,
            minimal_load_per_cpu: 4.0,
            poll_interval_secs: 5.0,
            low_delay_threshold_secs: 2.0,
            max_delay_secs: 10.0,
            memory_intensive_margin: 2,
            generic_margin: 1,
            target_open_files: 8192,
            target_processes: 4096,
        }
    }
}

impl ResourceConfig {
    pub fn poll_interval(&self) -> Duration {
        duration_from_secs(self.poll_interval_secs).max(Duration::from_millis(1))
    }
}
