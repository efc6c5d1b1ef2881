//! Retry & Backoff Module
//!
//! A standalone retry primitive shared by the worker pool (per-unit retries) and the
//! query client (per-endpoint retries).
//!
//! ## Model
//! - An operation is invoked with its 1-based attempt number.
//! - It answers `Ok(value)`, `Attempt::Retry(err)` (try again after a delay) or
//!   `Attempt::Abort(err)` (stop immediately, no further attempts).
//! - Delays between attempts follow a `Backoff` schedule derived from a base delay.
//!
//! ## Submodules
//! - **`policy`**: `RetryPolicy` and the `Backoff` schedules.
//! - **`runner`**: The `retry_with_backoff` driver and its failure type.

pub mod policy;
pub mod runner;

pub use policy::{Backoff, RetryPolicy};
pub use runner::{retry_with_backoff, Attempt, RetryFailure};

#[cfg(test)]
mod tests;
