//! HTTP transport
//!
//! One attempt, one route. The executor drives retries; a transport only
//! reports what happened on the wire.

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::{Client, Proxy};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use thunder_core::EgressRoute;

use crate::Headers;

pub use reqwest::Method;

/// Transport-level failure of a single attempt
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connect(String),

    #[error("Request failed: {0}")]
    Request(String),
}

/// An outbound request
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    /// Caller headers, merged over the generated identity headers
    pub headers: Headers,
    /// Overrides the policy's attempt count
    pub max_retries: Option<u32>,
    /// Overrides the policy's per-attempt timeout
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Headers::new(),
            max_retries: None,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_string(), value.into());
        self
    }

    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// A fully read response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    /// Body text; empty when the body could not be read
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request over one route
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        request: &HttpRequest,
        route: &EgressRoute,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError>;
}

/// reqwest-backed transport, one cached client per route
#[derive(Default)]
pub struct ReqwestTransport {
    clients: Mutex<HashMap<EgressRoute, Client>>,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn client_for(&self, route: &EgressRoute) -> Result<Client, TransportError> {
        if let Some(client) = self.clients.lock().get(route) {
            return Ok(client.clone());
        }

        let client = create_client(route)?;
        self.clients.lock().insert(route.clone(), client.clone());
        Ok(client)
    }
}

/// Create an HTTP client that egresses through `route`
pub fn create_client(route: &EgressRoute) -> Result<Client, TransportError> {
    let mut builder = Client::builder();

    if let Some(url) = route.proxy_url() {
        let proxy = Proxy::all(url).map_err(|e| TransportError::ClientBuild(e.to_string()))?;
        builder = builder.proxy(proxy);
    } else {
        builder = builder.no_proxy();
    }

    builder
        .build()
        .map_err(|e| TransportError::ClientBuild(e.to_string()))
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(
        &self,
        request: &HttpRequest,
        route: &EgressRoute,
        timeout: Duration,
    ) -> Result<HttpResponse, TransportError> {
        let client = self.client_for(route)?;

        let mut builder = client
            .request(request.method.clone(), &request.url)
            .timeout(timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let response = builder.send().await.map_err(|e| classify_error(e, timeout))?;
        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                debug!("Unreadable body from {}: {}", request.url, e);
                String::new()
            }
        };

        Ok(HttpResponse { status, body })
    }
}

fn classify_error(error: reqwest::Error, timeout: Duration) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(timeout)
    } else if error.is_connect() {
        TransportError::Connect(error.to_string())
    } else {
        TransportError::Request(error.to_string())
    }
}
