//! HTTP client for the Maverick API
//!
//! Shared by the reader and the command publisher: bearer authentication,
//! status mapping and retries with exponential backoff.

use crate::config::{DestinationConfig, RetryConfig};
use crate::domain::errors::{DestinationError, SyncError};
use crate::domain::Result;
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Maverick HTTP client
pub struct MaverickClient {
    base_url: String,
    client: Client,
    api_key: Option<String>,
    retry: RetryConfig,
}

impl MaverickClient {
    /// Creates a client from the destination configuration
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the HTTP client cannot be built.
    pub fn new(config: &DestinationConfig) -> Result<Self> {
        let mut builder = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30));

        if !config.tls_verify {
            tracing::warn!("TLS certificate verification disabled for the Maverick API");
            builder = builder.danger_accept_invalid_certs(true);
        }

        let client = builder
            .build()
            .map_err(|e| SyncError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            api_key: config
                .api_key
                .as_ref()
                .map(|k| k.expose_secret().as_ref().to_string()),
            retry: config.retry.clone(),
        })
    }

    /// Absolute URL for `path` (which starts with `/`)
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn get(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.get(self.url(path)))
    }

    pub fn post(&self, path: &str) -> RequestBuilder {
        self.authorize(self.client.post(self.url(path)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Sends a request and decodes the JSON body of a successful response
    ///
    /// 4xx responses map to [`DestinationError::ClientError`], 5xx responses
    /// to [`DestinationError::ServerError`].
    pub async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(map_transport_error)?;
        let response = check_status(response).await?;
        response.json::<T>().await.map_err(|e| {
            SyncError::Destination(DestinationError::QueryFailed(format!(
                "Invalid response body: {e}"
            )))
        })
    }

    /// Retry an operation with exponential backoff
    ///
    /// Only retryable errors are retried; the delay grows by
    /// `backoff_multiplier` per attempt and is capped at `max_delay_ms`.
    pub async fn retry_request<F, T, Fut>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let max_retries = self.retry.max_retries;
        let mut attempt = 0;

        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    attempt += 1;
                    if attempt > max_retries || !e.is_retryable() {
                        return Err(e);
                    }

                    let delay_ms = (self.retry.initial_delay_ms as f64
                        * self.retry.backoff_multiplier.powf((attempt - 1) as f64))
                        as u64;
                    let delay_ms = delay_ms.min(self.retry.max_delay_ms);

                    tracing::debug!(delay_ms, "Backing off before retry");
                    crate::log_retry_attempt!(attempt, max_retries, e);

                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                }
            }
        }
    }
}

fn map_transport_error(e: reqwest::Error) -> SyncError {
    if e.is_timeout() {
        SyncError::Destination(DestinationError::Timeout(e.to_string()))
    } else {
        SyncError::Destination(DestinationError::ConnectionFailed(e.to_string()))
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let message = response.text().await.unwrap_or_default();
    let status = status.as_u16();
    let error = if status >= 500 {
        DestinationError::ServerError { status, message }
    } else {
        DestinationError::ClientError { status, message }
    };
    Err(SyncError::Destination(error))
}
