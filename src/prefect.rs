//! GraphQL client for the Prefect API
//!
//! One persistent `reqwest::Client` per trigger instance, so connection reuse
//! and the retry policy apply uniformly to every query the trigger makes.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Total attempts per query, including the first one.
const MAX_ATTEMPTS: u32 = 5;
/// Base backoff delay, doubled after each failed attempt.
const BACKOFF_BASE: Duration = Duration::from_secs(1);

/// Errors from the Prefect API client
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed after {attempts} attempts: {source}")]
    Network {
        attempts: u32,
        #[source]
        source: reqwest::Error,
    },

    #[error("server returned status {status} after {attempts} attempts")]
    Status { attempts: u32, status: StatusCode },

    #[error("failed to decode response body: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Client for the Prefect GraphQL API
#[derive(Debug, Clone)]
pub struct PrefectClient {
    http_client: reqwest::Client,
    api_url: String,
    auth_token: String,
}

impl PrefectClient {
    pub fn new(api_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .expect("failed to create HTTP client"),
            api_url: api_url.into(),
            auth_token: auth_token.into(),
        }
    }

    /// Execute a GraphQL query and return the decoded JSON response.
    ///
    /// Transient upstream failures (HTTP 502/503/504, timeouts, connection
    /// errors) are retried with exponential backoff up to [`MAX_ATTEMPTS`];
    /// anything else fails immediately. An empty `data` object is a valid
    /// response, not an error.
    pub async fn query(&self, query: &str, variables: Value) -> Result<Value, ApiError> {
        let body = serde_json::json!({ "query": query, "variables": variables });

        let mut delay = BACKOFF_BASE;
        let mut attempt = 1;
        loop {
            let result = self
                .http_client
                .post(&self.api_url)
                .bearer_auth(&self.auth_token)
                .header(reqwest::header::ACCEPT, "application/json")
                .json(&body)
                .send()
                .await;

            let error = match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return response.json().await.map_err(ApiError::Decode);
                    }
                    ApiError::Status {
                        attempts: attempt,
                        status,
                    }
                }
                Err(source) => ApiError::Network {
                    attempts: attempt,
                    source,
                },
            };

            if attempt >= MAX_ATTEMPTS || !is_transient(&error) {
                return Err(error);
            }

            tracing::warn!(
                attempt,
                error = %error,
                "Prefect API query failed, retrying in {:?}",
                delay
            );
            tokio::time::sleep(delay).await;
            delay *= 2;
            attempt += 1;
        }
    }
}

/// Whether an error is worth retrying: gateway-style 5xx responses and
/// transport-level failures (timeout, refused connection).
fn is_transient(error: &ApiError) -> bool {
    match error {
        ApiError::Status { status, .. } => matches!(
            *status,
            StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
        ),
        ApiError::Network { source, .. } => source.is_timeout() || source.is_connect(),
        ApiError::Decode(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_errors_are_transient() {
        for status in [
            StatusCode::BAD_GATEWAY,
            StatusCode::SERVICE_UNAVAILABLE,
            StatusCode::GATEWAY_TIMEOUT,
        ] {
            let error = ApiError::Status {
                attempts: 1,
                status,
            };
            assert!(is_transient(&error), "{} should be retried", status);
        }
    }

    #[test]
    fn test_client_errors_are_not_transient() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
        ] {
            let error = ApiError::Status {
                attempts: 1,
                status,
            };
            assert!(!is_transient(&error), "{} should not be retried", status);
        }
    }
}
