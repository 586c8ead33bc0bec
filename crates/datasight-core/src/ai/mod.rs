//! AI insight generation
//!
//! # Architecture
//!
//! - `InsightClient`: resilient wrapper around one OpenAI-compatible
//!   chat-completions endpoint (timeout, bounded retries, backoff, debug
//!   snapshot)
//! - `FallbackInsightGenerator`: deterministic text from local statistics
//! - `FallbackPolicy`: decides what happens when the client fails
//! - `InsightService`: ties them together; `generate_insight` never fails
//!
//! # Usage
//!
//! ```rust,ignore
//! let service = InsightService::new(InsightClient::new(config.ai.clone()));
//! let result = service
//!     .generate_insight(&analysis, Some(&spec), sample_rows, &AiOptions::default())
//!     .await;
//! println!("{} ({})", result.insights(), result.provider().as_str());
//! ```

mod client;
mod debug;
mod error;
mod fallback;
mod prompt;
mod transport;
pub mod types;

pub use client::{
    backoff_delay, classify_response, AttemptOutcome, InsightClient, RetryState, Sleeper,
    TokioSleeper,
};
pub use debug::DebugSnapshot;
pub use error::InsightError;
pub use fallback::FallbackInsightGenerator;
pub use prompt::{ChartSemantics, InsightRequest};
pub use transport::{CompletionTransport, HttpTransport, RawResponse, TransportError};

use std::time::Instant;

use tracing::info;

use crate::models::{AiOptions, AnalysisResult, InsightResult, SampleRow, VisualizationSpec};

/// What to do after the client failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackDecision {
    /// Answer with locally generated text and record the error
    UseFallback,
}

/// Maps client failures to a [`FallbackDecision`]
///
/// Every error class, credential errors included, currently degrades to
/// the local generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPolicy;

impl FallbackPolicy {
    pub fn decide(&self, _error: &InsightError) -> FallbackDecision {
        FallbackDecision::UseFallback
    }
}

/// Produces an [`InsightResult`] for every request
#[derive(Clone)]
pub struct InsightService {
    client: InsightClient,
    fallback: FallbackInsightGenerator,
    policy: FallbackPolicy,
}

impl InsightService {
    pub fn new(client: InsightClient) -> Self {
        Self {
            client,
            fallback: FallbackInsightGenerator::new(),
            policy: FallbackPolicy,
        }
    }

    pub fn client(&self) -> &InsightClient {
        &self.client
    }

    /// Generate insight text, falling back to local rules on any failure
    ///
    /// `options.timeout` overrides the per-attempt timeout and also bounds
    /// the whole call, backoff sleeps included.
    pub async fn generate_insight(
        &self,
        analysis: &AnalysisResult,
        viz: Option<&VisualizationSpec>,
        sample_rows: Vec<SampleRow>,
        options: &AiOptions,
    ) -> InsightResult {
        let mut policy = self.client.config().request_config();
        if let Some(timeout) = options.timeout {
            policy.timeout = timeout;
        }

        let model = self.client.model().to_string();
        let request = InsightRequest::new(analysis, viz, sample_rows, &model, policy.timeout);
        let started = Instant::now();

        let outcome = self
            .client
            .complete_within(&request, &policy, options.timeout)
            .await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match outcome {
            Ok(text) => {
                info!(elapsed_ms, model = %model, "Insight generated remotely");
                InsightResult::remote(&model, text)
            }
            Err(err) => match self.policy.decide(&err) {
                FallbackDecision::UseFallback => {
                    info!(elapsed_ms, error = %err, class = err.class(), "Using fallback insight");
                    InsightResult::fallback(self.fallback.generate(analysis, viz), Some(err.to_string()))
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::models::Provider;
    use crate::test_utils::{completion_body, RecordingSleeper, ScriptedTransport};
    use std::sync::Arc;
    use std::time::Duration;

    fn analysis() -> AnalysisResult {
        AnalysisResult::default()
    }

    fn service(transport: Arc<ScriptedTransport>, max_retries: u32) -> InsightService {
        let config = ClientConfig {
            api_key: Some("sk-test".into()),
            max_retries,
            backoff_base: Duration::from_millis(10),
            ..Default::default()
        };
        InsightService::new(InsightClient::with_transport(
            config,
            transport,
            Arc::new(RecordingSleeper::default()),
        ))
    }

    #[test]
    fn test_policy_always_falls_back() {
        let policy = FallbackPolicy;
        for err in [
            InsightError::Unauthorized(401),
            InsightError::Timeout,
            InsightError::Configuration("x".into()),
        ] {
            assert_eq!(policy.decide(&err), FallbackDecision::UseFallback);
        }
    }

    #[tokio::test]
    async fn test_remote_result() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(RawResponse::new(
            200,
            completion_body("Sales are concentrated in Paris."),
        ))]));
        let result = service(transport, 0)
            .generate_insight(&AnalysisResult::default(), None, Vec::new(), &AiOptions::default())
            .await;

        assert_eq!(result.provider(), Provider::Remote);
        assert!(!result.used_fallback());
        assert_eq!(result.insights(), "Sales are concentrated in Paris.");
        assert!(result.upstream_error().is_none());
    }

    #[tokio::test]
    async fn test_all_retryable_failures_fall_back() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(RawResponse::new(503, "")),
            Ok(RawResponse::new(503, "")),
            Ok(RawResponse::new(503, "")),
        ]));
        let result = service(transport.clone(), 2)
            .generate_insight(&AnalysisResult::default(), None, Vec::new(), &AiOptions::default())
            .await;

        assert_eq!(result.provider(), Provider::Fallback);
        assert!(result.used_fallback());
        assert!(!result.insights().is_empty());
        assert_eq!(result.upstream_error(), Some("Server error (HTTP 503)"));
        assert_eq!(transport.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_deadline_falls_back_with_timeout() {
        let transport = Arc::new(
            ScriptedTransport::new(vec![Ok(RawResponse::new(200, completion_body("late")))])
                .with_delay(Duration::from_secs(30)),
        );
        let options = AiOptions {
            timeout: Some(Duration::from_secs(2)),
            sample_rows: None,
        };
        let result = service(transport, 0)
            .generate_insight(&AnalysisResult::default(), None, Vec::new(), &options)
            .await;

        assert_eq!(result.provider(), Provider::Fallback);
        assert_eq!(result.upstream_error(), Some("Timeout"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_deadline_caps_retries_and_backoff() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(RawResponse::new(503, "")),
            Ok(RawResponse::new(503, "")),
            Ok(RawResponse::new(503, "")),
            Ok(RawResponse::new(503, "")),
        ]));
        let config = ClientConfig {
            api_key: Some("sk-test".into()),
            max_retries: 3,
            backoff_base: Duration::from_secs(5),
            ..Default::default()
        };
        let service = InsightService::new(InsightClient::with_transport(
            config,
            transport.clone(),
            Arc::new(TokioSleeper),
        ));
        let deadline = Duration::from_secs(3);
        let options = AiOptions {
            timeout: Some(deadline),
            sample_rows: None,
        };

        let started = tokio::time::Instant::now();
        let result = service
            .generate_insight(&analysis(), None, Vec::new(), &options)
            .await;
        let elapsed = started.elapsed();

        assert_eq!(result.provider(), Provider::Fallback);
        assert_eq!(result.upstream_error(), Some("Timeout"));
        assert!(elapsed >= deadline);
        assert!(elapsed < Duration::from_secs(5));
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stage_deadline_overwrites_debug_snapshot() {
        let dir = tempfile::TempDir::new().unwrap();
        let debug_path = dir.path().join("insight_last.json");
        let config = ClientConfig {
            api_key: Some("sk-test".into()),
            max_retries: 0,
            debug_enabled: true,
            debug_path: debug_path.clone(),
            ..Default::default()
        };

        let fast = Arc::new(ScriptedTransport::new(vec![Ok(RawResponse::new(
            200,
            completion_body("quick"),
        ))]));
        let first = InsightService::new(InsightClient::with_transport(
            config.clone(),
            fast,
            Arc::new(RecordingSleeper::default()),
        ))
        .generate_insight(&analysis(), None, Vec::new(), &AiOptions::default())
        .await;
        assert_eq!(first.provider(), Provider::Remote);
        assert!(DebugSnapshot::read_from(&debug_path).unwrap().is_success());

        let slow = Arc::new(
            ScriptedTransport::new(vec![Ok(RawResponse::new(200, completion_body("late")))])
                .with_delay(Duration::from_secs(30)),
        );
        let options = AiOptions {
            timeout: Some(Duration::from_secs(2)),
            sample_rows: None,
        };
        let second = InsightService::new(InsightClient::with_transport(
            config,
            slow,
            Arc::new(RecordingSleeper::default()),
        ))
        .generate_insight(&analysis(), None, Vec::new(), &options)
        .await;
        assert_eq!(second.upstream_error(), Some("Timeout"));

        let snapshot = DebugSnapshot::read_from(&debug_path).unwrap();
        assert!(!snapshot.is_success());
        assert_eq!(snapshot.error.as_deref(), Some("Timeout"));
        assert_eq!(snapshot.status, None);
        assert_eq!(snapshot.attempts, 1);
    }
}
