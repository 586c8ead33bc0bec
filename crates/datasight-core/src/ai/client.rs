//! Resilient client for the chat-completions insight endpoint
//!
//! One call makes up to `max_retries + 1` attempts. Rate limiting, 5xx,
//! timeouts and connection failures are retried after
//! `backoff_base * 2^attempt`; every other failure ends the call at once.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::debug::DebugSnapshot;
use super::error::InsightError;
use super::prompt::InsightRequest;
use super::transport::{CompletionTransport, HttpTransport, RawResponse, TransportError};
use super::types::ChatCompletionResponse;
use crate::config::{ClientConfig, RequestConfig};

/// Result of one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success(String),
    Retryable(InsightError),
    Fatal(InsightError),
}

impl AttemptOutcome {
    fn from_error(err: InsightError) -> Self {
        if err.is_retryable() {
            Self::Retryable(err)
        } else {
            Self::Fatal(err)
        }
    }
}

/// Classify an HTTP response
///
/// 2xx bodies must carry a non-empty `choices[0].message.content`;
/// anything else is a malformed response and is not retried.
pub fn classify_response(response: &RawResponse) -> AttemptOutcome {
    if !(200..300).contains(&response.status) {
        return AttemptOutcome::from_error(InsightError::from_status(response.status));
    }

    let parsed: ChatCompletionResponse = match serde_json::from_str(&response.body) {
        Ok(parsed) => parsed,
        Err(e) => {
            return AttemptOutcome::Fatal(InsightError::MalformedResponse(format!(
                "invalid JSON: {}",
                e
            )))
        }
    };

    match parsed.first_content() {
        Some(content) => AttemptOutcome::Success(content.to_string()),
        None => AttemptOutcome::Fatal(InsightError::MalformedResponse(
            "missing choices[0].message.content".into(),
        )),
    }
}

fn classify_transport_error(err: &TransportError) -> AttemptOutcome {
    match err {
        TransportError::Timeout => AttemptOutcome::Retryable(InsightError::Timeout),
        TransportError::Network(msg) => {
            AttemptOutcome::Retryable(InsightError::NetworkError(msg.clone()))
        }
    }
}

/// Delay before retrying after attempt `attempt` (zero-based)
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt))
}

/// Bookkeeping for one client call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetryState {
    pub attempts: u32,
    pub total_backoff: Duration,
    pub last_error: Option<InsightError>,
}

/// Waits between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Insight endpoint client
#[derive(Clone)]
pub struct InsightClient {
    config: ClientConfig,
    transport: Arc<dyn CompletionTransport>,
    sleeper: Arc<dyn Sleeper>,
}

impl InsightClient {
    /// Create a client using HTTP and real sleeps
    pub fn new(config: ClientConfig) -> Self {
        Self::with_transport(config, Arc::new(HttpTransport::new()), Arc::new(TokioSleeper))
    }

    /// Create a client with explicit transport and sleeper
    pub fn with_transport(
        config: ClientConfig,
        transport: Arc<dyn CompletionTransport>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            config,
            transport,
            sleeper,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    pub fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }

    /// Request insight text
    ///
    /// Returns the classified error of the last attempt when no attempt
    /// succeeds. With `debug_enabled`, the last raw response or error is
    /// written to the debug slot whatever the outcome.
    pub async fn complete(
        &self,
        request: &InsightRequest,
        policy: &RequestConfig,
    ) -> Result<String, InsightError> {
        self.complete_within(request, policy, None).await
    }

    /// Like [`complete`](Self::complete), with `deadline` bounding the whole
    /// call, attempts and backoff sleeps included
    ///
    /// An expired deadline ends the call with [`InsightError::Timeout`]; the
    /// debug snapshot is still written.
    pub async fn complete_within(
        &self,
        request: &InsightRequest,
        policy: &RequestConfig,
        deadline: Option<Duration>,
    ) -> Result<String, InsightError> {
        let endpoint = self.endpoint();
        let mut snapshot = DebugSnapshot::new(&endpoint, &request.model);
        let mut state = RetryState::default();

        let result = match deadline {
            Some(limit) => {
                let timed = tokio::time::timeout(
                    limit,
                    self.run_attempts(request, policy, &endpoint, &mut snapshot, &mut state),
                )
                .await;
                match timed {
                    Ok(result) => result,
                    Err(_) => {
                        warn!(
                            attempt = state.attempts,
                            deadline_ms = limit.as_millis() as u64,
                            "Insight call deadline expired"
                        );
                        state.last_error = Some(InsightError::Timeout);
                        Err(InsightError::Timeout)
                    }
                }
            }
            None => {
                self.run_attempts(request, policy, &endpoint, &mut snapshot, &mut state)
                    .await
            }
        };

        if policy.debug_enabled {
            snapshot.attempts = state.attempts;
            match &result {
                Ok(_) => snapshot.outcome = "success".to_string(),
                Err(e) => snapshot.error = Some(e.to_string()),
            }
            if let Err(e) = snapshot.write_to(&self.config.debug_path) {
                warn!(path = %self.config.debug_path.display(), error = %e, "Failed to write insight debug snapshot");
            }
        }

        result
    }

    async fn run_attempts(
        &self,
        request: &InsightRequest,
        policy: &RequestConfig,
        endpoint: &str,
        snapshot: &mut DebugSnapshot,
        state: &mut RetryState,
    ) -> Result<String, InsightError> {

        let Some(api_key) = self.config.api_key.as_deref() else {
            let err = InsightError::Configuration("API key is not set".into());
            debug!("Insight client has no API key, skipping request");
            state.last_error = Some(err.clone());
            return Err(err);
        };
        if self.config.base_url.trim().is_empty() {
            let err = InsightError::Configuration("endpoint base URL is not set".into());
            state.last_error = Some(err.clone());
            return Err(err);
        }

        // Built once, reused on every attempt
        let body = request.to_chat_request(self.config.temperature);

        for attempt in 0..=policy.max_retries {
            state.attempts = attempt + 1;
            let started = Instant::now();

            let outcome = match self
                .transport
                .post(endpoint, api_key, &body, policy.timeout)
                .await
            {
                Ok(response) => {
                    *snapshot = snapshot.clone().with_body(response.status, &response.body);
                    classify_response(&response)
                }
                Err(err) => {
                    snapshot.status = None;
                    snapshot.body_excerpt = None;
                    classify_transport_error(&err)
                }
            };
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match outcome {
                AttemptOutcome::Success(text) => {
                    info!(attempt = state.attempts, elapsed_ms, model = %request.model, "Insight request succeeded");
                    state.last_error = None;
                    return Ok(text);
                }
                AttemptOutcome::Fatal(err) => {
                    warn!(attempt = state.attempts, elapsed_ms, error = %err, "Insight request failed (not retryable)");
                    state.last_error = Some(err.clone());
                    return Err(err);
                }
                AttemptOutcome::Retryable(err) => {
                    state.last_error = Some(err.clone());
                    if attempt < policy.max_retries {
                        let delay = backoff_delay(policy.backoff_base, attempt);
                        warn!(
                            attempt = state.attempts,
                            elapsed_ms,
                            error = %err,
                            retry_in_ms = delay.as_millis() as u64,
                            "Insight request failed, retrying"
                        );
                        self.sleeper.sleep(delay).await;
                        state.total_backoff += delay;
                    } else {
                        warn!(attempt = state.attempts, elapsed_ms, error = %err, "Insight request failed, retries exhausted");
                    }
                }
            }
        }

        Err(state
            .last_error
            .clone()
            .unwrap_or_else(|| InsightError::NetworkError("no attempt was made".into())))
    }
}
