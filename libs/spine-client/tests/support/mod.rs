#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use spine_client::{
    CallerIdentity, HeaderValue, Interrupted, Pause, RemoteRequest, RemoteResponse, SpineConfig,
    TokioPause, Transport, TransportError,
};
use tokio::time::Instant;

pub const SPINE_URL: &str = "https://spine";
pub const CONTENT_LOCATION: &str = "https://spine/content-location";
pub const RESPONSE_BODY: &str = "some_body";

/// A request as seen by [`ScriptedTransport`], with the (tokio) time it was sent
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub request: RemoteRequest,
    pub at: Instant,
}

/// In-memory transport that replays a scripted list of replies and records
/// every request it receives.
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RemoteResponse, TransportError>>>,
    fallback: Option<RemoteResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new(
        replies: impl IntoIterator<Item = Result<RemoteResponse, TransportError>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(replies.into_iter().collect()),
            fallback: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn responses(responses: impl IntoIterator<Item = RemoteResponse>) -> Arc<Self> {
        Self::new(responses.into_iter().map(Ok))
    }

    /// Replies with `response` forever
    pub fn repeating(response: RemoteResponse) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(VecDeque::new()),
            fallback: Some(response),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            request: request.clone(),
            at: Instant::now(),
        });

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(reply) => reply,
            None => self
                .fallback
                .clone()
                .ok_or_else(|| TransportError::Other("script exhausted".to_string())),
        }
    }
}

/// Wraps a transport and takes `latency` to answer every request
pub struct SlowTransport {
    inner: Arc<ScriptedTransport>,
    latency: Duration,
}

impl SlowTransport {
    pub fn new(inner: Arc<ScriptedTransport>, latency: Duration) -> Arc<Self> {
        Arc::new(Self { inner, latency })
    }
}

#[async_trait]
impl Transport for SlowTransport {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, TransportError> {
        let response = self.inner.send(request).await;
        tokio::time::sleep(self.latency).await;
        response
    }
}

/// Pause that behaves like [`TokioPause`] for the first `allowed` waits and
/// is interrupted afterwards.
pub struct InterruptingPause {
    allowed: u32,
    calls: AtomicU32,
}

impl InterruptingPause {
    pub fn after(allowed: u32) -> Self {
        Self {
            allowed,
            calls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Pause for InterruptingPause {
    async fn pause(&self, duration: Duration) -> Result<(), Interrupted> {
        if self.calls.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(Interrupted);
        }
        TokioPause.pause(duration).await
    }
}

pub fn ready(body: &str) -> RemoteResponse {
    RemoteResponse::new(200).with_body(body)
}

pub fn not_ready(retry_after_ms: u64) -> RemoteResponse {
    RemoteResponse::new(202).with_header(
        spine_client::HeaderName::from_static("retry-after"),
        HeaderValue::from_str(&retry_after_ms.to_string()).unwrap(),
    )
}

pub fn accepted(location: &str) -> RemoteResponse {
    RemoteResponse::new(202).with_header(
        spine_client::HeaderName::from_static("content-location"),
        HeaderValue::from_str(location).unwrap(),
    )
}

pub fn spine_config() -> SpineConfig {
    let mut config = SpineConfig::new(SPINE_URL);
    config.scr_endpoint = "/scr".to_string();
    config.acs_endpoint = "/acs".to_string();
    config.scr_result_repeat_timeout_ms = 500;
    config
}

pub fn identity() -> CallerIdentity {
    CallerIdentity::new("200000000001")
        .identity("user-identity")
        .session_urid("555254240100")
        .correlation_id("corr-1")
        .request_id("req-1")
}

pub fn poll_request(location: &str) -> Result<RemoteRequest, TransportError> {
    identity().apply(RemoteRequest::get(location)).build()
}
