//! Worker Pool Module
//!
//! Executes a batch of work units (one per partition, or one per external query)
//! concurrently, with a worker count sized from live resource readings.
//!
//! ## Execution Model
//! 1. **Validation**: The source location, the processor name and the workload kind are
//!    checked first; a bad invocation fails with `ValidationError` before any work starts.
//! 2. **Sizing**: `ResourceMonitor::adjust_workers` decides how many workers run.
//! 3. **Pacing**: Workers start one at a time, separated by the adjusted spawn delay.
//! 4. **Pulling**: Each worker claims the next unit from the shared `UnitQueue`
//!    (first-available), so a slow unit never starves the others.
//! 5. **Aggregation**: Outcomes are collected per unit; one failure never aborts the run.
//!
//! ## Submodules
//! - **`types`**: Work units, statuses, the pool report, configuration and errors.
//! - **`registry`**: Maps processor names (e.g., "load_notes") to async closures.
//! - **`queue`**: Lock-free claiming plus per-unit status tracking.
//! - **`pool`**: `WorkerPool`, the spawn/execute/aggregate driver.

pub mod pool;
pub mod queue;
pub mod registry;
pub mod types;
