//! Authentication hooks.

use url::Url;

use super::transport::HeaderList;

/// What the loader needs from the authentication subsystem.
pub trait RequestAuthPort: Send + Sync {
    /// Headers to attach to a request for `url`. Consulted per request.
    fn request_headers(&self, url: &Url) -> HeaderList;

    /// Called when a request for `url` came back 401.
    fn on_unauthorized(&self, url: &Url, reason: &str) {
        let _ = (url, reason);
    }
}

/// Attaches nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl RequestAuthPort for NoAuth {
    fn request_headers(&self, _url: &Url) -> HeaderList {
        Vec::new()
    }
}

/// Attaches the same headers to every request.
#[derive(Debug, Clone, Default)]
pub struct StaticHeaders {
    headers: HeaderList,
}

impl StaticHeaders {
    /// Create from a header list.
    pub const fn new(headers: HeaderList) -> Self {
        Self { headers }
    }

    /// Add one header.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

impl RequestAuthPort for StaticHeaders {
    fn request_headers(&self, _url: &Url) -> HeaderList {
        self.headers.clone()
    }
}
