//! Outbound requests and inbound responses exchanged with the remote

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use url::Url;

use crate::error::TransportError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One outbound message. Immutable once built; a new one is built per attempt.
#[derive(Debug, Clone)]
pub struct RemoteRequest {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<String>,
}

impl RemoteRequest {
    pub fn get(url: impl Into<String>) -> RemoteRequestBuilder {
        RemoteRequestBuilder::new(Method::Get, url.into())
    }

    pub fn post(url: impl Into<String>) -> RemoteRequestBuilder {
        RemoteRequestBuilder::new(Method::Post, url.into())
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Builder for [`RemoteRequest`].
///
/// Header names are unique: setting a header again replaces its value. The
/// first invalid header or URL is reported by [`RemoteRequestBuilder::build`].
#[derive(Debug)]
pub struct RemoteRequestBuilder {
    method: Method,
    url: String,
    headers: HeaderMap,
    body: Option<String>,
    error: Option<TransportError>,
}

impl RemoteRequestBuilder {
    fn new(method: Method, url: String) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: None,
            error: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        if self.error.is_some() {
            return self;
        }

        let parsed_name = HeaderName::from_bytes(name.as_bytes());
        let parsed_value = HeaderValue::from_str(value);
        match (parsed_name, parsed_value) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
            }
            (Err(e), _) => {
                self.error = Some(TransportError::InvalidHeader {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
            (_, Err(e)) => {
                self.error = Some(TransportError::InvalidHeader {
                    name: name.to_string(),
                    reason: e.to_string(),
                });
            }
        }
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn build(self) -> Result<RemoteRequest, TransportError> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Url::parse(&self.url).map_err(|e| TransportError::InvalidUrl(format!("{}: {e}", self.url)))?;

        Ok(RemoteRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: self.body,
        })
    }
}

/// Status, headers and raw body returned by the transport.
///
/// Header lookups are case-insensitive. When a header is repeated the FIRST
/// value wins.
#[derive(Debug, Clone, Default)]
pub struct RemoteResponse {
    pub status: u16,
    pub headers: HeaderMap,
    /// Body decoded as text; `None` when the remote sent no bytes
    pub body: Option<String>,
}

impl RemoteResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    /// Append a header, keeping any earlier values for the same name
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.append(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// First value of `name`, if present and valid visible ASCII
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::RETRY_AFTER;

    #[test]
    fn test_request_headers_are_unique() {
        let request = RemoteRequest::post("https://spine/clinical")
            .header("Content-Type", "text/xml")
            .header("content-type", "application/fhir+json")
            .body("<xml/>")
            .build()
            .unwrap();

        assert_eq!(request.headers().len(), 1);
        assert_eq!(request.header("CONTENT-TYPE"), Some("application/fhir+json"));
        assert_eq!(request.body(), Some("<xml/>"));
        assert_eq!(request.method(), Method::Post);
    }

    #[test]
    fn test_invalid_header_value_is_reported_on_build() {
        let result = RemoteRequest::get("https://spine/poll")
            .header("NHSD-ASID", "bad\nvalue")
            .header("NHSD-Request-ID", "ok")
            .build();

        match result {
            Err(TransportError::InvalidHeader { name, .. }) => assert_eq!(name, "NHSD-ASID"),
            other => panic!("expected InvalidHeader, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_url_is_reported_on_build() {
        let result = RemoteRequest::get("not a url").build();
        assert!(matches!(result, Err(TransportError::InvalidUrl(_))));
    }

    #[test]
    fn test_response_duplicate_headers_first_wins() {
        let response = RemoteResponse::new(202)
            .with_header(RETRY_AFTER, HeaderValue::from_static("50"))
            .with_header(RETRY_AFTER, HeaderValue::from_static("900"));

        assert_eq!(response.header("retry-after"), Some("50"));
        assert_eq!(response.header("Retry-After"), Some("50"));
        assert_eq!(response.headers.get_all(RETRY_AFTER).iter().count(), 2);
    }
}
