use crate::config::Config;
use crate::retry::{with_retry_if, RetryConfig};
use anyhow::{Context, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

const USER_AGENT: &str = concat!("cx-section-titles/", env!("CARGO_PKG_VERSION"));

/// Failure talking to one of the upstream JSON APIs
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        source: reqwest::Error,
    },

    #[error("{url} returned {status}: {body}")]
    Status {
        url: String,
        status: StatusCode,
        body: String,
    },

    #[error("failed to decode response from {url}: {source}")]
    Decode {
        url: String,
        source: reqwest::Error,
    },
}

impl ApiError {
    /// Network errors, 429 and 5xx are worth retrying; other 4xx and bad payloads are not
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Transport { .. } => true,
            ApiError::Status { status, .. } => {
                *status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            ApiError::Decode { .. } => false,
        }
    }
}

/// Build the shared HTTP client with the configured request timeout
pub fn build_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.http_timeout)
        .user_agent(USER_AGENT)
        .build()
        .context("Failed to build HTTP client")
}

/// GET `url` and decode the JSON body
pub async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
    retry: &RetryConfig,
) -> Result<T, ApiError> {
    with_retry_if(
        retry,
        &format!("GET {}", url),
        || async move {
            let response = client
                .get(url)
                .send()
                .await
                .map_err(|source| ApiError::Transport {
                    url: url.to_string(),
                    source,
                })?;
            decode(url, response).await
        },
        ApiError::is_retryable,
    )
    .await
}

/// POST `body` as JSON to `url` and decode the JSON response
pub async fn post_json<B, T>(
    client: &reqwest::Client,
    url: &str,
    body: &B,
    retry: &RetryConfig,
) -> Result<T, ApiError>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    with_retry_if(
        retry,
        &format!("POST {}", url),
        || async move {
            let response = client
                .post(url)
                .json(body)
                .send()
                .await
                .map_err(|source| ApiError::Transport {
                    url: url.to_string(),
                    source,
                })?;
            decode(url, response).await
        },
        ApiError::is_retryable,
    )
    .await
}

async fn decode<T: DeserializeOwned>(url: &str, response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
        return Err(ApiError::Status {
            url: url.to_string(),
            status,
            body,
        });
    }

    response.json().await.map_err(|source| ApiError::Decode {
        url: url.to_string(),
        source,
    })
}
