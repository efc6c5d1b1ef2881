//! Resource Monitoring Module
//!
//! Answers the scheduling questions the worker pool asks before and while it spawns
//! workers: is the machine healthy enough to start, how many workers should run, and how
//! long to pause between spawns.
//!
//! ## Design
//! - Readings come from a `SystemStats` capability. Production uses `ProcStats`
//!   (`/proc/meminfo`, `/proc/loadavg`); tests inject `FixedStats`.
//! - Every decision takes a fresh `ResourceSample`; samples are never cached or shared.
//! - `Constrained`, `TimedOut` and `Partial` are ordinary answers, not errors.
//!
//! ## Submodules
//! - **`types`**: Samples, modes, workload kinds, thresholds.
//! - **`system`**: The `SystemStats` seam and its implementations.
//! - **`limits`**: Best-effort rlimit raising.
//! - **`monitor`**: `ResourceMonitor`, the decision logic.

pub mod limits;
pub mod monitor;
pub mod system;
pub mod types;
