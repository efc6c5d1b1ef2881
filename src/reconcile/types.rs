use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Identifier of a boundary feature (an OSM relation id).
pub type FeatureId = u64;

/// Outcome of comparing a live id set against a backup id set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReconciliationResult {
    pub matched: bool,
    /// Size of the backup set.
    pub expected_count: usize,
    /// Size of the live set.
    pub actual_count: usize,
    /// In the backup, absent from the live set. Sorted ascending.
    pub missing_ids: Vec<FeatureId>,
    /// In the live set, absent from the backup. Sorted ascending.
    pub extra_ids: Vec<FeatureId>,
    /// `ceil(|missing| * 100 / max(|backup|, 1))`.
    pub gap_percentage: u32,
}

impl ReconciliationResult {
    /// One-line description with at most `limit` ids from each list.
    pub fn summary(&self, limit: usize) -> String {
        format!(
            "matched={} expected={} actual={} gap={}% missing=[{}] extra=[{}]",
            self.matched,
            self.expected_count,
            self.actual_count,
            self.gap_percentage,
            preview(&self.missing_ids, limit),
            preview(&self.extra_ids, limit),
        )
    }
}

fn preview(ids: &[FeatureId], limit: usize) -> String {
    let mut shown: Vec<String> = ids.iter().take(limit).map(|id| id.to_string()).collect();
    if ids.len() > limit {
        shown.push(format!("... +{}", ids.len() - limit));
    }
    shown.join(", ")
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InputError {
    #[error("both live and backup id sets are empty, nothing to reconcile")]
    NothingToReconcile,
}

#[derive(Debug, Error)]
pub enum BackupError {
    #[error("failed to read backup {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("backup {} contains no ids", .0.display())]
    Empty(PathBuf),
}
