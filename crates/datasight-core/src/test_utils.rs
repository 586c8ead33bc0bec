//! Test utilities for datasight-core
//!
//! Provides a mock chat-completions server for end-to-end tests and an
//! in-process scripted transport and recording sleeper for retry tests.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, routing::post, Router};
use serde_json::json;
use tokio::sync::oneshot;

use crate::ai::types::ChatCompletionRequest;
use crate::ai::{CompletionTransport, RawResponse, Sleeper, TransportError};

/// A well-formed completion body carrying `content`
pub fn completion_body(content: &str) -> String {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "model": "test-model",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
    .to_string()
}

struct MockState {
    replies: Mutex<VecDeque<(u16, String)>>,
    last: Mutex<(u16, String)>,
    hits: AtomicUsize,
}

/// Mock chat-completions server
///
/// Replays the scripted replies in order, then repeats the last one.
pub struct MockCompletionServer {
    addr: SocketAddr,
    state: Arc<MockState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl MockCompletionServer {
    /// Start the mock server on an available port
    pub async fn start(replies: Vec<(u16, String)>) -> Self {
        let last = replies
            .last()
            .cloned()
            .unwrap_or_else(|| (200, completion_body("mock insight")));
        let state = Arc::new(MockState {
            replies: Mutex::new(replies.into()),
            last: Mutex::new(last),
            hits: AtomicUsize::new(0),
        });

        let app = Router::new()
            .route("/chat/completions", post(handle_completion))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .unwrap();
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
        }
    }

    /// Server that always answers with `content`
    pub async fn ok(content: &str) -> Self {
        Self::start(vec![(200, completion_body(content))]).await
    }

    /// Base URL to use as the client's `base_url`
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Number of requests received
    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockCompletionServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn handle_completion(State(state): State<Arc<MockState>>) -> (StatusCode, String) {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let next = state.replies.lock().unwrap().pop_front();
    let (status, body) = match next {
        Some(reply) => {
            *state.last.lock().unwrap() = reply.clone();
            reply
        }
        None => state.last.lock().unwrap().clone(),
    };
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, body)
}

/// In-process transport replaying scripted results
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse, TransportError>>>,
    bodies: Mutex<Vec<ChatCompletionRequest>>,
    calls: AtomicUsize,
    delay: Option<Duration>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<Result<RawResponse, TransportError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            bodies: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Sleep (on the tokio clock) before answering each call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Request bodies received, in order
    pub fn bodies(&self) -> Vec<ChatCompletionRequest> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionTransport for ScriptedTransport {
    async fn post(
        &self,
        _url: &str,
        _api_key: &str,
        body: &ChatCompletionRequest,
        _timeout: Duration,
    ) -> Result<RawResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(body.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Network("script exhausted".into())))
    }
}

/// Sleeper that records requested delays without waiting
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    recorded: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn recorded(&self) -> Vec<Duration> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.recorded.lock().unwrap().push(duration);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::HttpTransport;
    use crate::ai::types::ChatMessage;

    fn body() -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: "m".into(),
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.3,
        }
    }

    #[tokio::test]
    async fn test_mock_server_replays_script() {
        let server = MockCompletionServer::start(vec![
            (503, String::new()),
            (200, completion_body("done")),
        ])
        .await;
        let transport = HttpTransport::new();
        let url = format!("{}/chat/completions", server.url());

        let first = transport.post(&url, "k", &body(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(first.status, 503);
        let second = transport.post(&url, "k", &body(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(second.status, 200);
        let third = transport.post(&url, "k", &body(), Duration::from_secs(5)).await.unwrap();
        assert_eq!(third.status, 200);
        assert_eq!(server.hits(), 3);
    }
}
