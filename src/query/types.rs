//! Query Data Types
//!
//! Endpoints, responses and the error hierarchy of the query client.

use crate::config::duration_from_secs;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// One reachable address of the query service.
///
/// Lower `priority` values are tried first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub priority: u32,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, priority: u32) -> Self {
        Self {
            url: url.into(),
            priority,
        }
    }

    /// Builds endpoints from an ordered URL list, priority following list order.
    pub fn from_urls<S: AsRef<str>>(urls: &[S]) -> Vec<Endpoint> {
        urls.iter()
            .enumerate()
            .map(|(i, url)| Endpoint::new(url.as_ref().trim(), i as u32))
            .filter(|endpoint| !endpoint.url.is_empty())
            .collect()
    }
}

/// Expected shape of a well-formed response body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ResponseFormat {
    Json,
    Csv,
}

/// A response that passed validation.
#[derive(Debug, Clone)]
pub struct QueryResponse {
    /// URL of the endpoint that answered.
    pub endpoint: String,
    pub body: String,
    /// Attempts made across all endpoints, including the successful one.
    pub attempts: usize,
}

/// Settings for the query client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Endpoint URLs in priority order.
    pub endpoints: Vec<String>,
    pub retries_per_endpoint: usize,
    /// Base backoff between attempts on one endpoint; grows linearly.
    pub backoff_secs: f64,
    /// Longest single backoff wait.
    pub max_backoff_secs: f64,
    /// Random extra wait added to every backoff, in milliseconds.
    pub jitter_ms: u64,
    pub request_timeout_secs: u64,
    pub format: ResponseFormat,
    /// Query used to list the boundary relation ids.
    pub boundary_query: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            endpoints: vec![
                "https://overpass-api.de/api/interpreter".to_string(),
                "https://overpass.kumi.systems/api/interpreter".to_string(),
            ],
            retries_per_endpoint: 3,
            backoff_secs: 5.0,
            max_backoff_secs: 60.0,
            jitter_ms: 50,
            request_timeout_secs: 180,
            format: ResponseFormat::Csv,
            boundary_query: "[out:csv(::id)][timeout:60];relation[\"admin_level\"=\"2\"][\"type\"=\"boundary\"][\"boundary\"=\"administrative\"];out ids;".to_string(),
        }
    }
}

impl QueryConfig {
    pub fn backoff(&self) -> Duration {
        duration_from_secs(self.backoff_secs)
    }

    pub fn max_backoff(&self) -> Duration {
        duration_from_secs(self.max_backoff_secs)
    }

    pub fn jitter(&self) -> Duration {
        Duration::from_millis(self.jitter_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }
}

/// Failure of a single request at the transport level.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(String),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
}

/// Why one attempt did not produce a usable response.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryFailure {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Last observed failure for one endpoint.
#[derive(Debug, Clone)]
pub struct EndpointFailure {
    pub endpoint: String,
    pub attempts: usize,
    pub last_error: QueryFailure,
}

/// Every endpoint ran out of attempts.
#[derive(Debug, Clone, Error)]
#[error(
    "all {} endpoint(s) exhausted after {} attempt(s)",
    .failures.len(),
    .failures.iter().map(|f| f.attempts).sum::<usize>()
)]
pub struct ExhaustedError {
    pub failures: Vec<EndpointFailure>,
}

impl ExhaustedError {
    pub fn total_attempts(&self) -> usize {
        self.failures.iter().map(|f| f.attempts).sum()
    }
}
