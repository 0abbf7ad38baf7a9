//! HTTP policy registry client
//!
//! Typed client for the registry's REST API. Connection failures on
//! idempotent reads are retried with exponential backoff; API-level errors
//! are mapped onto the `RegistryError` taxonomy.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::config::RegistryConfig;
use crate::error::{RegistryError, RegistryResult};
use crate::registry::types::RegistryPolicy;
use crate::registry::RegistryClient;

/// Policy registry API client
pub struct HttpRegistryClient {
    http: Client,
    base_url: String,
    token: Option<String>,
    max_retries: u32,
}

impl HttpRegistryClient {
    /// Create a new registry client from configuration
    pub fn new(config: &RegistryConfig) -> RegistryResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .user_agent(format!("routeguard/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(RegistryError::Request)?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            token: config.token.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Build a URL for an API endpoint
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Add bearer authentication when a token is configured
    fn authenticate(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Execute a request with retries
    async fn execute(&self, request: RequestBuilder) -> RegistryResult<Response> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * 2u64.pow(attempt - 1));
                tokio::time::sleep(delay).await;
                debug!("Retrying registry request (attempt {})", attempt + 1);
            }

            let req = request.try_clone().ok_or_else(|| {
                RegistryError::InvalidResponse("Cannot clone request".to_string())
            })?;

            match req.send().await {
                Ok(response) => {
                    let result = Self::handle_response(response).await;
                    match result {
                        Err(e) if is_retryable(&e) => {
                            warn!("Registry request failed: {}", e);
                            last_error = Some(e);
                        }
                        other => return other,
                    }
                }
                Err(e) => {
                    warn!("Registry request failed: {}", e);
                    let retryable = e.is_timeout() || e.is_connect();
                    last_error = Some(RegistryError::Request(e));
                    if !retryable {
                        break;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| RegistryError::InvalidResponse("Unknown error".to_string())))
    }

    /// Map non-success statuses onto the error taxonomy
    async fn handle_response(response: Response) -> RegistryResult<Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(RegistryError::from_response(status.as_u16(), &body))
    }

    /// Make a GET request and decode the JSON body
    #[instrument(skip(self), fields(path = %path))]
    async fn get<T: DeserializeOwned>(&self, path: &str) -> RegistryResult<T> {
        let url = self.url(path);
        let request = self.authenticate(self.http.get(&url));

        let response = self.execute(request).await?;
        response.json().await.map_err(|e| {
            RegistryError::InvalidResponse(format!("Failed to parse response: {}", e))
        })
    }
}

#[async_trait]
impl RegistryClient for HttpRegistryClient {
    async fn fetch_all(&self) -> RegistryResult<Vec<RegistryPolicy>> {
        self.get("/policies").await
    }

    async fn fetch_one(&self, client_id: &str) -> RegistryResult<RegistryPolicy> {
        let path = format!("/policies/{}", client_id);
        match self.get::<RegistryPolicy>(&path).await {
            Err(RegistryError::Api { status: 404, .. }) => Err(RegistryError::NotFound {
                client_id: client_id.to_string(),
            }),
            other => other,
        }
    }
}

/// Whether a failed request is worth retrying
fn is_retryable(error: &RegistryError) -> bool {
    match error {
        RegistryError::Request(e) => e.is_timeout() || e.is_connect(),
        RegistryError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_retryable() {
        assert!(is_retryable(&RegistryError::Api {
            status: 500,
            message: "Internal error".to_string()
        }));
        assert!(is_retryable(&RegistryError::Api {
            status: 503,
            message: "Service unavailable".to_string()
        }));
        assert!(!is_retryable(&RegistryError::Api {
            status: 400,
            message: "Bad request".to_string()
        }));
        assert!(!is_retryable(&RegistryError::Unauthorized));
        assert!(!is_retryable(&RegistryError::NotFound {
            client_id: "client1".to_string()
        }));
    }
}
