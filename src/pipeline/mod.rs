//! Ingestion Pipeline Module
//!
//! Wires the core components into one run: partition the notes document, load the parts
//! through the worker pool, reconcile boundary ids, clean up.
//!
//! ## Submodules
//! - **`validator`**: Record-level note validation of one partition.
//! - **`store`**: The `NoteStore` target and its in-memory implementation.
//! - **`summary`**: `RunSummary` and the tolerance-based exit code.
//! - **`runner`**: `Pipeline`, the orchestrator.

pub mod runner;
pub mod store;
pub mod summary;
pub mod validator;
