use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode, Url};
use serde::de::DeserializeOwned;

pub mod controller;
pub mod error;

pub use error::{ClientError, DiscoveryError, TransportError};

/// A fully materialized outbound HTTP request.
///
/// The body is buffered up front so the same request can be forwarded to the
/// network and kept for rendering without re-reading a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Path plus query string, as it appears on the request line.
    pub fn target(&self) -> String {
        match self.url.query() {
            Some(query) => format!("{}?{}", self.url.path(), query),
            None => self.url.path().to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Anything that can carry a request to the control plane and bring back its
/// response. Implementations must hand back transport failures unchanged.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Service registry used to announce the mock provider to the control plane.
#[async_trait]
pub trait ServiceDiscovery: Send + Sync {
    /// Verify the registry is reachable.
    async fn connect(&self) -> Result<(), DiscoveryError>;

    /// Announce `addr` as an instance of `service`.
    async fn register(&self, service: &str, addr: &str) -> Result<(), DiscoveryError>;
}
