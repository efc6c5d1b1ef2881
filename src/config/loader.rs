//! Configuration Loading
//!
//! JSON file first, then environment overrides.

use super::types::*;

use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const ENV_WORKERS: &str = "NOTES_WORKERS";
pub const ENV_PARTS: &str = "NOTES_PARTS";
pub const ENV_WORK_DIR: &str = "NOTES_WORK_DIR";
pub const ENV_ENDPOINTS: &str = "NOTES_ENDPOINTS";

impl PipelineConfig {
    /// Reads `path` when given (defaults otherwise) and applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(content)
    }

    /// Applies overrides read through `lookup`; unset or blank variables are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let value = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(raw) = value(ENV_WORKERS) {
            self.pool.requested_workers = parse_positive(ENV_WORKERS, &raw)?;
        }
        if let Some(raw) = value(ENV_PARTS) {
            self.partition.target_parts = parse_positive(ENV_PARTS, &raw)?;
        }
        if let Some(raw) = value(ENV_WORK_DIR) {
            self.work_dir = PathBuf::from(raw.trim());
        }
        if let Some(raw) = value(ENV_ENDPOINTS) {
            let endpoints: Vec<String> = raw
                .split(',')
                .map(str::trim)
                .filter(|url| !url.is_empty())
                .map(str::to_string)
                .collect();
            if endpoints.is_empty() {
                return Err(ConfigError::InvalidOverride {
                    name: ENV_ENDPOINTS.to_string(),
                    value: raw,
                });
            }
            self.query.endpoints = endpoints;
        }
        Ok(())
    }
}

fn parse_positive<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr + PartialOrd + Default,
{
    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::InvalidOverride {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}
