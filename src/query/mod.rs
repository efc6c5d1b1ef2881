//! External Query Module
//!
//! Client side of the external geodata query service (an Overpass-style endpoint that
//! answers boundary/administrative queries).
//!
//! ## Behaviour
//! - Endpoints are tried in priority order; each gets `retries_per_endpoint` attempts
//!   with a linearly increasing backoff before the client moves on.
//! - A response that is empty or structurally invalid counts as a failed attempt.
//! - When every endpoint is exhausted the caller receives an `ExhaustedError` listing the
//!   last failure per endpoint, and is expected to fall back to backup data.
//!
//! ## Submodules
//! - **`types`**: Endpoints, responses, configuration and error types.
//! - **`transport`**: The `QueryTransport` seam and its `reqwest` implementation.
//! - **`validate`**: Response well-formedness checks and CSV id extraction.
//! - **`client`**: `RetryingClient`, the multi-endpoint failover driver.

pub mod client;
pub mod transport;
pub mod types;
pub mod validate;
