//! Pipeline Configuration
//!
//! One explicit `PipelineConfig` value carries every threshold, endpoint list and retry
//! count. It is built once per run (JSON file plus `NOTES_*` environment overrides) and
//! each component is handed its own section.

pub mod loader;
pub mod types;

pub use types::{duration_from_secs, ConfigError, PipelineConfig, MAX_CONFIG_DURATION};
