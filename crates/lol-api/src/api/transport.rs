//! HTTP transport abstraction.
//!
//! The client performs all network I/O through the [`Transport`] trait so
//! that gate behavior can be driven against scripted responses in tests.
//! [`HttpTransport`] is the reqwest-backed implementation used in production.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use crate::error::{BoxError, Error, Result};

/// Raw result of one HTTP exchange, before any interpretation.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers (`Retry-After` is the one the gate cares about)
    pub headers: HeaderMap,
    /// Response body
    pub body: String,
}

/// A pluggable way to perform HTTP GET requests.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch `url`, returning status, headers, and body uninterpreted.
    async fn fetch(&self, url: &str) -> Result<RawResponse, BoxError>;
}

/// Default transport backed by a shared [`reqwest::Client`].
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with the standard timeout and user agent.
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("lol-api/0.1.0")
            .build()
            .map_err(|e| Error::Transport(Box::new(e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<RawResponse, BoxError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await?;

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}
