//! Transport adapter
//!
//! Executes exactly one HTTP request and reports status, headers and body.
//! Status codes are not interpreted and nothing is retried here.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::TransportError;
use crate::models::{Method, RemoteRequest, RemoteResponse};

/// Sends a single request to the remote.
///
/// Implementations are shared between concurrent flows and must be
/// `Send + Sync`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, TransportError> {
        (**self).send(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for &T {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, TransportError> {
        (**self).send(request).await
    }
}

/// [`Transport`] backed by a pooled `reqwest` client.
///
/// Response bodies are decoded to text with the charset named in
/// `Content-Type` (UTF-8 when absent). Bytes that do not decode are replaced
/// with U+FFFD; the text is not otherwise altered.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests fail after `timeout`.
    ///
    /// This timeout is per request and independent of a flow's polling budget.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RemoteRequest) -> Result<RemoteResponse, TransportError> {
        let builder = match request.method() {
            Method::Get => self.client.get(request.url()),
            Method::Post => self.client.post(request.url()),
        };
        let mut builder = builder.headers(request.headers().clone());
        if let Some(body) = request.body() {
            builder = builder.body(body.to_owned());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let text = response.text().await?;

        Ok(RemoteResponse {
            status,
            headers,
            body: (!text.is_empty()).then_some(text),
        })
    }
}
