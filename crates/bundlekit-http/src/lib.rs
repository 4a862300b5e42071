#![doc = include_str!("../README.md")]
#![deny(unsafe_code)]

use std::time::Duration;

use async_trait::async_trait;
use bundlekit_core::{HeaderList, HttpRequest, HttpResponse, TransportError, TransportPort};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

/// Production transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build a client with a connect timeout of `connect_timeout`.
    pub fn new(connect_timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .connect_timeout(connect_timeout)
            .user_agent(concat!("bundlekit/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::new(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

fn to_header_map(headers: &HeaderList) -> HeaderMap {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                map.append(name, value);
            }
            _ => warn!(target: "bundlekit.http", header = %name, "Dropping invalid request header"),
        }
    }
    map
}

fn from_header_map(headers: &HeaderMap) -> HeaderList {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect()
}

#[async_trait]
impl TransportPort for ReqwestTransport {
    async fn get(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(target: "bundlekit.http", url = %request.url, "GET");
        let response = self
            .client
            .get(request.url.clone())
            .headers(to_header_map(&request.headers))
            .send()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = from_header_map(response.headers());
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::new(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body: (!body.is_empty()).then_some(body),
        })
    }
}
