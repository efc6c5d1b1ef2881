//! Retrying Query Client
//!
//! Drives one query across the configured endpoints. The per-endpoint retry loop is the
//! shared `retry_with_backoff` primitive; this file only adds failover and validation.

use super::transport::{HttpTransport, QueryTransport};
use super::types::*;
use super::validate::{parse_csv_ids, validate_response};
use crate::retry::{retry_with_backoff, Attempt, RetryPolicy};

use std::collections::BTreeSet;
use std::time::Duration;

pub struct RetryingClient<T> {
    transport: T,
    /// Sorted by ascending priority.
    endpoints: Vec<Endpoint>,
    policy: RetryPolicy,
    format: ResponseFormat,
}

impl RetryingClient<HttpTransport> {
    /// Builds an HTTP-backed client from configuration.
    pub fn from_config(config: &QueryConfig) -> Self {
        let transport = HttpTransport::new(config.request_timeout());
        Self::new(
            transport,
            Endpoint::from_urls(&config.endpoints),
            config.retries_per_endpoint,
            config.backoff(),
        )
        .with_max_backoff(config.max_backoff())
        .with_jitter(config.jitter())
        .with_format(config.format)
    }
}

impl<T: QueryTransport> RetryingClient<T> {
    /// # Arguments
    /// * `retries_per_endpoint` - attempts made on each endpoint before failing over.
    /// * `backoff` - base delay; the n-th wait on one endpoint is `n * backoff`.
    pub fn new(
        transport: T,
        mut endpoints: Vec<Endpoint>,
        retries_per_endpoint: usize,
        backoff: Duration,
    ) -> Self {
        endpoints.sort_by_key(|e| e.priority);
        Self {
            transport,
            endpoints,
            policy: RetryPolicy::linear(retries_per_endpoint, backoff),
            format: ResponseFormat::Json,
        }
    }

    pub fn with_format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    /// Caps any single backoff wait.
    pub fn with_max_backoff(mut self, max_backoff: Duration) -> Self {
        self.policy = self.policy.with_max_delay(max_backoff);
        self
    }

    /// Adds a random extra wait in `[0, jitter)` to every backoff.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.policy = self.policy.with_jitter(jitter);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Sends `request`, failing over between endpoints until one returns a valid body.
    pub async fn query(&self, request: &str) -> Result<QueryResponse, ExhaustedError> {
        let mut failures = Vec::with_capacity(self.endpoints.len());
        let mut attempts_so_far = 0;

        for endpoint in &self.endpoints {
            let outcome = retry_with_backoff(&self.policy, |attempt| async move {
                tracing::debug!(
                    "Query attempt {}/{} on {}",
                    attempt,
                    self.policy.attempts(),
                    endpoint.url
                );
                let body = self
                    .transport
                    .send(endpoint, request)
                    .await
                    .map_err(|e| Attempt::Retry(QueryFailure::from(e)))?;

                validate_response(&body, self.format)
                    .map_err(|reason| Attempt::Retry(QueryFailure::InvalidResponse(reason)))?;
                Ok::<_, Attempt<QueryFailure>>(body)
            })
            .await;

            match outcome {
                Ok((body, attempts)) => {
                    tracing::info!(
                        "Query answered by {} after {} attempt(s)",
                        endpoint.url,
                        attempts_so_far + attempts
                    );
                    return Ok(QueryResponse {
                        endpoint: endpoint.url.clone(),
                        body,
                        attempts: attempts_so_far + attempts,
                    });
                }
                Err(failure) => {
                    tracing::warn!(
                        "Endpoint {} exhausted after {} attempt(s): {}",
                        endpoint.url,
                        failure.attempts,
                        failure.last_error
                    );
                    attempts_so_far += failure.attempts;
                    failures.push(EndpointFailure {
                        endpoint: endpoint.url.clone(),
                        attempts: failure.attempts,
                        last_error: failure.last_error,
                    });
                }
            }
        }

        tracing::error!(
            "All {} query endpoint(s) exhausted ({} attempts)",
            failures.len(),
            attempts_so_far
        );
        Err(ExhaustedError { failures })
    }

    /// Runs a CSV id query and returns the ids it lists.
    pub async fn query_ids(&self, request: &str) -> Result<BTreeSet<u64>, ExhaustedError> {
        let response = self.query(request).await?;
        Ok(parse_csv_ids(&response.body))
    }
}
