//! Partitioning Data Types
//!
//! Record markers, plans, materialized partitions and the partitioning error type.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Byte markers delimiting one record.
///
/// A start marker only counts when followed by whitespace, `>` or `/`, so `<note`
/// does not match `<notes>` or `<note_comment>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMarkers {
    pub start: Vec<u8>,
    pub end: Vec<u8>,
}

impl RecordMarkers {
    pub fn new(start: &str, end: &str) -> Self {
        Self {
            start: start.as_bytes().to_vec(),
            end: end.as_bytes().to_vec(),
        }
    }

    pub fn longest(&self) -> usize {
        self.start.len().max(self.end.len())
    }
}

impl Default for RecordMarkers {
    fn default() -> Self {
        Self::new("<note", "</note>")
    }
}

/// Partitioner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Documents at least this large use the binary strategy under `Auto`.
    pub binary_threshold_bytes: u64,
    /// Read granularity and census block size.
    pub block_size: usize,
    pub record_start: String,
    pub record_end: String,
    pub target_parts: usize,
    pub min_records_per_part: usize,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            binary_threshold_bytes: 100 * 1024 * 1024,
            block_size: 1024 * 1024,
            record_start: "<note".to_string(),
            record_end: "</note>".to_string(),
            target_parts: 8,
            min_records_per_part: 1,
        }
    }
}

impl PartitionConfig {
    pub fn markers(&self) -> RecordMarkers {
        RecordMarkers::new(&self.record_start, &self.record_end)
    }
}

/// Which algorithm locates the cut points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartitionStrategy {
    /// One walk over every record, collecting all record spans.
    Linear,
    /// Block census plus a binary search per cut point.
    Binary,
}

/// Strategy requested by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyChoice {
    Auto,
    Force(PartitionStrategy),
}

/// Arguments of one partitioning call.
#[derive(Debug, Clone)]
pub struct PartitionRequest {
    /// Upper bound on the number of parts.
    pub target_parts: usize,
    pub min_records_per_part: usize,
    /// Expected parallelism; only consulted when choosing a strategy.
    pub worker_hint: usize,
    pub strategy: StrategyChoice,
}

impl PartitionRequest {
    pub fn new(target_parts: usize, min_records_per_part: usize, worker_hint: usize) -> Self {
        Self {
            target_parts,
            min_records_per_part,
            worker_hint,
            strategy: StrategyChoice::Auto,
        }
    }

    pub fn with_strategy(mut self, strategy: PartitionStrategy) -> Self {
        self.strategy = StrategyChoice::Force(strategy);
        self
    }
}

/// Half-open byte range `[start, end)` in the source document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One part of a plan, not yet written anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedPart {
    pub index: usize,
    /// Records plus the whitespace preceding them.
    pub range: ByteRange,
    pub record_count: usize,
}

/// Where each part begins and ends, computed without writing any output.
#[derive(Debug, Clone)]
pub struct PartitionPlan {
    pub strategy: PartitionStrategy,
    pub total_records: usize,
    /// Name of the root element.
    pub root: String,
    /// Everything before the first record.
    pub header: ByteRange,
    /// Everything after the last record.
    pub footer: ByteRange,
    pub parts: Vec<PlannedPart>,
    /// Boundary seeks performed while locating cut points.
    pub seeks: usize,
}

impl PartitionPlan {
    pub fn is_empty(&self) -> bool {
        self.total_records == 0
    }
}

/// A part written out as a standalone document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    pub index: usize,
    pub source_range: ByteRange,
    pub record_count: usize,
    pub path: PathBuf,
}

/// Every partition produced from one document, in index order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionSet {
    pub run_dir: PathBuf,
    pub strategy: PartitionStrategy,
    pub total_records: usize,
    pub partitions: Vec<Partition>,
}

impl PartitionSet {
    pub fn len(&self) -> usize {
        self.partitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.is_empty()
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.run_dir.join("manifest.json")
    }

    /// Deletes one partition file once its unit has completed.
    pub fn remove(&self, index: usize) -> std::io::Result<()> {
        match self.partitions.iter().find(|p| p.index == index) {
            Some(partition) => remove_if_exists(&partition.path),
            None => Ok(()),
        }
    }

    /// Deletes the whole run directory.
    pub fn cleanup(&self) -> std::io::Result<()> {
        match std::fs::remove_dir_all(&self.run_dir) {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

fn remove_if_exists(path: &Path) -> std::io::Result<()> {
    match std::fs::remove_file(path) {
        Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}

/// Result of `Partitioner::partition`.
#[derive(Debug)]
pub enum PartitionOutcome {
    /// A well-formed document with zero records.
    NothingToDo,
    Split(PartitionSet),
}

impl PartitionOutcome {
    pub fn partitions(&self) -> &[Partition] {
        match self {
            PartitionOutcome::NothingToDo => &[],
            PartitionOutcome::Split(set) => &set.partitions,
        }
    }
}

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("document has no root wrapper")]
    MissingRoot,
    #[error("record starting at byte {offset} is not terminated")]
    UnterminatedRecord { offset: u64 },
    #[error("record end marker at byte {offset} has no matching start")]
    UnexpectedEnd { offset: u64 },
    #[error("unbalanced records: {starts} start marker(s), {ends} end marker(s)")]
    Unbalanced { starts: u64, ends: u64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
