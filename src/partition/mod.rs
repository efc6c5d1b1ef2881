//! Document Partitioning Module
//!
//! Splits one large notes document into N standalone documents along record boundaries
//! so they can be validated and loaded in parallel.
//!
//! ## Guarantees
//! - Every part carries the source's root wrapper and only whole records.
//! - Concatenating the records of all parts in index order gives back the source records.
//! - Part sizes differ by at most one record; no part is empty.
//! - A well-formed document with no records is `NothingToDo`, not an error.
//!
//! ## Strategies
//! - **Linear**: one sequential walk collecting every record span.
//! - **Binary**: a block census of marker counts, then a binary search over byte
//!   offsets for each cut point. Chosen for large documents when parallelism is expected.
//!
//! ## Submodules
//! - **`types`**: Markers, requests, plans, partitions and errors.
//! - **`scanner`**: Windowed marker search and the record-boundary primitives.
//! - **`planner`**: Part sizing and both cut-point strategies.
//! - **`writer`**: Materializes parts and the manifest.
//! - **`partitioner`**: `Partitioner`, the entry point.

pub mod partitioner;
pub mod planner;
pub mod scanner;
pub mod types;
pub mod writer;

#[cfg(test)]
mod tests;
