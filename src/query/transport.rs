//! Transport abstraction for testability
//!
//! The client never talks to `reqwest` directly; it goes through `QueryTransport` so tests
//! can count attempts and script failures.

use super::types::{Endpoint, TransportError};

use std::future::Future;
use std::time::Duration;

/// Sends one query to one endpoint and returns the raw body.
pub trait QueryTransport: Send + Sync {
    fn send(
        &self,
        endpoint: &Endpoint,
        query: &str,
    ) -> impl Future<Output = Result<String, TransportError>> + Send;
}

/// HTTP transport posting the query as the `data` form field, the way Overpass
/// interpreters expect it.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
        }
    }
}

impl QueryTransport for HttpTransport {
    async fn send(&self, endpoint: &Endpoint, query: &str) -> Result<String, TransportError> {
        tracing::debug!("POST {} ({} byte query)", endpoint.url, query.len());

        let response = self
            .client
            .post(&endpoint.url)
            .form(&[("data", query)])
            .timeout(self.timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        response.text().await.map_err(map_reqwest_error)
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Request(err.to_string())
    }
}
