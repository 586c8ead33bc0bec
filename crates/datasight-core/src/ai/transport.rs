//! HTTP transport for the completion endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use super::types::ChatCompletionRequest;

/// Status and body of one HTTP exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Failure before a status line was received
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("{0}")]
    Network(String),
}

/// Sends one completion request
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        api_key: &str,
        body: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError>;
}

/// reqwest-backed transport
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    http_client: Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http_client: Client::new(),
        }
    }
}

fn map_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout
    } else {
        TransportError::Network(err.to_string())
    }
}

#[async_trait]
impl CompletionTransport for HttpTransport {
    async fn post(
        &self,
        url: &str,
        api_key: &str,
        body: &ChatCompletionRequest,
        timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        let response = self
            .http_client
            .post(url)
            .bearer_auth(api_key)
            .json(body)
            .timeout(timeout)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_reqwest_error)?;
        Ok(RawResponse { status, body })
    }
}
