//! Network transport port.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use url::Url;

/// Ordered request or response headers.
pub type HeaderList = Vec<(String, String)>;

/// A GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL including query.
    pub url: Url,
    /// Headers to attach.
    pub headers: HeaderList,
}

impl HttpRequest {
    /// Create a request with no headers.
    pub const fn get(url: Url) -> Self {
        Self {
            url,
            headers: Vec::new(),
        }
    }

    /// Attach headers.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderList) -> Self {
        self.headers.extend(headers);
        self
    }
}

/// A completed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HeaderList,
    /// Payload, `None` when the server sent nothing.
    pub body: Option<Bytes>,
}

impl HttpResponse {
    /// Create a response with a body.
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Some(body.into()),
        }
    }

    /// Create a response with no body.
    pub const fn empty(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: None,
        }
    }

    /// Attach a response header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Look up a header, ignoring ASCII case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// The request never produced a response.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("transport error: {message}")]
pub struct TransportError {
    /// Transport message.
    pub message: String,
}

impl TransportError {
    /// Create a transport error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Performs GET requests.
///
/// Dropping the returned future must abort the request; the pipeline relies
/// on this for timeouts and cancellation.
#[async_trait]
pub trait TransportPort: Send + Sync {
    /// Send `request` and wait for the full response.
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_lookup_ignores_case() {
        let mut response = HttpResponse::new(200, "x");
        response
            .headers
            .push(("Content-Type".to_string(), "application/json".to_string()));
        assert_eq!(response.header("content-type"), Some("application/json"));
        assert_eq!(response.header("etag"), None);
    }
}
