//! Mock resource provider
//!
//! Stands in for a third-party provider so provisioning calls made by the
//! controller complete. Every request under `/providers` is logged and answered
//! with the same canned [`ResourceDescriptor`].

use crate::domain::controller::ResourceDescriptor;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// The payload every provisioning callback receives.
pub fn default_payload() -> ResourceDescriptor {
    ResourceDescriptor {
        id: None,
        env: BTreeMap::from([("some".to_string(), "data".to_string())]),
    }
}

/// Serialize `payload` as the JSON response body, or answer 500 if it cannot
/// be encoded.
pub fn encode_payload<T: Serialize>(payload: &T) -> Response {
    match serde_json::to_vec(payload) {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(target: "provider", "failed to encode resource: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn handle_provision(
    State(payload): State<Arc<ResourceDescriptor>>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    info!(target: "provider", "{} {}", method, uri);
    info!(target: "provider", "\t{}", String::from_utf8_lossy(&body));
    encode_payload(payload.as_ref())
}

/// Router answering any method under `/providers`.
pub fn router(payload: ResourceDescriptor) -> Router {
    Router::new()
        .route("/providers", any(handle_provision))
        .route("/providers/*path", any(handle_provision))
        .with_state(Arc::new(payload))
}

/// A provider whose socket is bound and accepting connections into the
/// backlog, but whose accept loop has not been spawned yet.
pub struct MockProviderServer {
    listener: TcpListener,
    payload: ResourceDescriptor,
}

impl MockProviderServer {
    pub async fn bind(addr: SocketAddr) -> anyhow::Result<Self> {
        Self::bind_with_payload(addr, default_payload()).await
    }

    pub async fn bind_with_payload(
        addr: SocketAddr,
        payload: ResourceDescriptor,
    ) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, payload })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the accept loop on a background task for the rest of the process.
    pub fn spawn(self) -> anyhow::Result<RunningProvider> {
        let local_addr = self.listener.local_addr()?;
        info!(target: "provider", "Starting mock provider server on {}", local_addr);

        let app = router(self.payload);
        let listener = self.listener;
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                error!(target: "provider", "mock provider server stopped: {}", e);
            }
        });

        Ok(RunningProvider { local_addr, handle })
    }
}

pub struct RunningProvider {
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl RunningProvider {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use serde::Serializer;
    use tower::util::ServiceExt;

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("refusing to encode"))
        }
    }

    #[tokio::test]
    async fn test_encode_failure_is_500() {
        let response = encode_payload(&Unencodable);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_any_method_under_prefix() {
        let app = router(default_payload());

        for method in ["GET", "POST", "PUT", "DELETE"] {
            let request = Request::builder()
                .uri("/providers/123/resources")
                .method(method)
                .body(Body::from(r#"{"config":{}}"#))
                .unwrap();

            let response = app.clone().oneshot(request).await.unwrap();
            assert_eq!(response.status(), StatusCode::OK, "method {}", method);

            let body = response.into_body().collect().await.unwrap().to_bytes();
            let resource: ResourceDescriptor = serde_json::from_slice(&body).unwrap();
            assert_eq!(resource.env.get("some").map(String::as_str), Some("data"));
        }
    }

    #[tokio::test]
    async fn test_outside_prefix_is_not_found() {
        let app = router(default_payload());
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_bind_port_in_use_fails() {
        let first = MockProviderServer::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let addr = first.local_addr().unwrap();

        assert!(MockProviderServer::bind(addr).await.is_err());
    }

    #[tokio::test]
    async fn test_serves_after_bind_returns() {
        let server = MockProviderServer::bind("127.0.0.1:0".parse().unwrap())
            .await
            .unwrap();
        let running = server.spawn().unwrap();
        assert!(running.is_running());

        let response = reqwest::Client::new()
            .post(format!(
                "http://{}/providers/1/resources",
                running.local_addr()
            ))
            .body("{}")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);

        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body, serde_json::json!({ "env": { "some": "data" } }));
    }
}
