//! Reconciliation Module
//!
//! Compares the boundary ids reported by the live query service against the ids in a
//! trusted backup snapshot and quantifies how far they diverge.
//!
//! ## Submodules
//! - **`types`**: `ReconciliationResult` and error types.
//! - **`checker`**: The pure `reconcile` function.
//! - **`backup`**: Reads id sets out of backup snapshot files.

pub mod backup;
pub mod checker;
pub mod types;

#[cfg(test)]
mod tests;
