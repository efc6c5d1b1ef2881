//! Notes Ingestion Library
//!
//! This library crate defines the modules behind the `notes-ingest` binary (`main.rs`):
//! a partitioned, resource-aware loader for large geographic-notes documents.
//!
//! ## Architecture Modules
//!
//! - **`resources`**: Host memory and load sampling, worker-count and spawn-delay
//!   adjustment, process limits.
//! - **`partition`**: Splits one notes document into standalone, record-aligned parts
//!   (linear scan or binary search over a block census).
//! - **`executor`**: Bounded worker pool running one processor per partition with retries,
//!   per-unit timeouts and an optional overall deadline.
//! - **`retry`**: The shared retry-with-backoff primitive.
//! - **`query`**: Multi-endpoint query client with response validation and failover.
//! - **`reconcile`**: Compares live boundary ids against a backup snapshot.
//! - **`config`**: JSON configuration with environment overrides.
//! - **`pipeline`**: The orchestrator tying the above into one run.

pub mod config;
pub mod executor;
pub mod partition;
pub mod pipeline;
pub mod query;
pub mod reconcile;
pub mod resources;
pub mod retry;
