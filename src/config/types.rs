use crate::executor::types::PoolConfig;
use crate::partition::types::PartitionConfig;
use crate::query::types::QueryConfig;
use crate::resources::types::ResourceConfig;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Longest duration any `*_secs` setting converts to.
pub const MAX_CONFIG_DURATION: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Converts a seconds setting to a `Duration`.
///
/// Negative and NaN values become zero; values too large for a `Duration`, or above
/// `MAX_CONFIG_DURATION`, are capped.
pub fn duration_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0))
        .unwrap_or(MAX_CONFIG_DURATION)
        .min(MAX_CONFIG_DURATION)
}

/// Every setting of one pipeline run.
///
/// Each component receives its own section at construction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub resources: ResourceConfig,
    pub partition: PartitionConfig,
    pub pool: PoolConfig,
    pub query: QueryConfig,
    /// Failed or timed-out units tolerated before the run counts as failed.
    pub tolerance: usize,
    /// Parent directory of the per-run partition directories.
    pub work_dir: PathBuf,
    /// Seconds to wait for resources before falling back to a single worker.
    pub startup_wait_secs: f64,
    /// Overall pool budget in seconds; unset means no deadline.
    pub deadline_secs: Option<f64>,
    /// Keep partition files after the run.
    pub keep_partitions: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            resources: ResourceConfig::default(),
            partition: PartitionConfig::default(),
            pool: PoolConfig::default(),
            query: QueryConfig::default(),
            tolerance: 0,
            work_dir: std::env::temp_dir().join("notes_ingest"),
            startup_wait_secs: 60.0,
            deadline_secs: None,
            keep_partitions: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid value '{value}' for {name}")]
    InvalidOverride { name: String, value: String },
}
