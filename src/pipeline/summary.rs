use crate::executor::types::PoolReport;
use crate::partition::types::PartitionStrategy;
use crate::reconcile::types::ReconciliationResult;

use serde::Serialize;
use std::path::PathBuf;

/// Per-run report printed by the binary.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub input: PathBuf,
    pub strategy: Option<PartitionStrategy>,
    pub partitions: usize,
    pub records: usize,
    /// The input held no records; no unit ran.
    pub nothing_to_do: bool,
    /// Resources stayed constrained at startup, so units ran on a single worker.
    pub serial_fallback: bool,
    pub pool: PoolReport,
    pub notes_loaded: usize,
    pub notes_rejected: usize,
    /// Live ids compared against the backup; `None` when no comparison ran.
    pub reconciliation: Option<ReconciliationResult>,
    /// The live query was exhausted and the backup ids stood in for it.
    pub used_backup: bool,
    /// Size of the authoritative boundary set, live or backup.
    pub boundary_ids: usize,
    pub tolerance: usize,
    pub elapsed_ms: u64,
}

impl RunSummary {
    /// Units that did not succeed: failed, timed out or skipped.
    pub fn unit_failures(&self) -> usize {
        self.pool.failed + self.pool.timed_out + self.pool.skipped
    }

    pub fn within_tolerance(&self) -> bool {
        self.unit_failures() <= self.tolerance
    }

    pub fn exit_code(&self) -> i32 {
        if self.within_tolerance() {
            0
        } else {
            1
        }
    }
}
