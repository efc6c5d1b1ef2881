//! Partitioner
//!
//! Entry point of the module: chooses a strategy, plans the cuts and writes the parts.

use super::planner::{plan_binary, plan_linear};
use super::scanner::RecordScanner;
use super::types::*;
use super::writer::{write_manifest, write_partitions};

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use uuid::Uuid;

pub struct Partitioner {
    config: PartitionConfig,
    markers: RecordMarkers,
}

impl Partitioner {
    pub fn new(config: PartitionConfig) -> Self {
        let mut markers = config.markers();
        if markers.start.is_empty() || markers.end.is_empty() {
            tracing::warn!("Empty record markers configured, using <note / </note>");
            markers = RecordMarkers::default();
        }
        Self { config, markers }
    }

    pub fn config(&self) -> &PartitionConfig {
        &self.config
    }

    /// Strategy `request` resolves to for a document of `len` bytes.
    pub fn choose_strategy(&self, len: u64, request: &PartitionRequest) -> PartitionStrategy {
        match request.strategy {
            StrategyChoice::Force(strategy) => strategy,
            StrategyChoice::Auto => {
                if len >= self.config.binary_threshold_bytes
                    && request.worker_hint > 1
                    && request.target_parts > 1
                {
                    PartitionStrategy::Binary
                } else {
                    PartitionStrategy::Linear
                }
            }
        }
    }

    /// Computes cut points without writing anything.
    pub fn plan<R: Read + Seek>(
        &self,
        source: &mut R,
        request: &PartitionRequest,
    ) -> Result<PartitionPlan, PartitionError> {
        let mut scanner = RecordScanner::new(source, &self.markers, self.config.block_size)?;
        let strategy = self.choose_strategy(scanner.len(), request);

        tracing::debug!(
            "Planning {} byte document with {:?} strategy (target {} parts)",
            scanner.len(),
            strategy,
            request.target_parts
        );

        match strategy {
            PartitionStrategy::Linear => plan_linear(&mut scanner, request),
            PartitionStrategy::Binary => plan_binary(&mut scanner, request),
        }
    }

    /// Splits `input` into standalone documents under a fresh `run-<uuid>` directory
    /// inside `output_dir`.
    ///
    /// A well-formed document without records yields `NothingToDo` and writes nothing.
    pub fn partition(
        &self,
        input: &Path,
        output_dir: &Path,
        request: &PartitionRequest,
    ) -> Result<PartitionOutcome, PartitionError> {
        let mut source = BufReader::new(File::open(input)?);
        let plan = self.plan(&mut source, request)?;

        if plan.is_empty() {
            tracing::info!("{} contains no records, nothing to partition", input.display());
            return Ok(PartitionOutcome::NothingToDo);
        }

        let run_dir = output_dir.join(format!("run-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&run_dir)?;

        let partitions = match write_partitions(&mut source, &plan, &run_dir) {
            Ok(partitions) => partitions,
            Err(e) => {
                let _ = std::fs::remove_dir_all(&run_dir);
                return Err(e);
            }
        };

        let set = PartitionSet {
            run_dir,
            strategy: plan.strategy,
            total_records: plan.total_records,
            partitions,
        };
        write_manifest(&set)?;

        tracing::info!(
            "Split {} into {} partition(s) of {} records ({:?}, {} seeks)",
            input.display(),
            set.len(),
            set.total_records,
            plan.strategy,
            plan.seeks
        );
        Ok(PartitionOutcome::Split(set))
    }
}
