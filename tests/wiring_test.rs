mod common;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use controller_examples::adapters::discoverd::instance_id;
use controller_examples::config::{
    ControllerSettings, DiscoverySettings, ProviderSettings, Settings,
};
use controller_examples::generate_examples;
use secrecy::SecretString;
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

/// What the fake controller and fake discoverd observed.
#[derive(Default)]
struct Observed {
    controller_requests: Vec<(String, String)>,
    /// (service, instance id, instance body) per instance PUT
    instance_puts: Vec<(String, String, Value)>,
    provisioned_env: Option<Value>,
}

type Shared = Arc<Mutex<Observed>>;

async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn fake_discoverd(observed: Shared) -> SocketAddr {
    let app = Router::new()
        .route("/ping", get(|| async { StatusCode::OK }))
        .route("/services/:service", put(|| async { StatusCode::OK }))
        .route(
            "/services/:service/instances/:id",
            put(
                |Path((service, id)): Path<(String, String)>,
                 State(observed): State<Shared>,
                 Json(body): Json<Value>| async move {
                    observed.lock().await.instance_puts.push((service, id, body));
                    StatusCode::OK
                },
            ),
        )
        .with_state(observed);
    serve(app).await
}

/// Answers like the in-memory controller, except that provisioning a
/// resource calls the provider's registered address, as the real controller
/// does through discoverd.
async fn controller(
    State(observed): State<Shared>,
    method: Method,
    uri: Uri,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    observed
        .lock()
        .await
        .controller_requests
        .push((method.to_string(), path.clone()));

    let segments: Vec<&str> = path.trim_start_matches('/').split('/').collect();
    if method == Method::POST && matches!(segments.as_slice(), ["providers", _, "resources"]) {
        let provider_addr = observed
            .lock()
            .await
            .instance_puts
            .last()
            .and_then(|(_, _, body)| body["addr"].as_str().map(String::from));
        let Some(provider_addr) = provider_addr else {
            return (StatusCode::SERVICE_UNAVAILABLE, "provider not registered").into_response();
        };

        let reply = reqwest::Client::new()
            .post(format!("http://{}/providers/{}/resources", provider_addr, segments[1]))
            .json(&json!({}))
            .send()
            .await;
        let resource: Value = match reply {
            Ok(reply) => match reply.json().await {
                Ok(resource) => resource,
                Err(e) => return (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
            },
            Err(e) => return (StatusCode::BAD_GATEWAY, e.to_string()).into_response(),
        };
        observed.lock().await.provisioned_env = Some(resource["env"].clone());

        return Json(json!({
            "id": "resource_123",
            "provider": segments[1],
            "env": resource["env"],
        }))
        .into_response();
    }

    let (status, body) = common::controller_answer(method.as_str(), &path, &body);
    (
        StatusCode::from_u16(status).unwrap(),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response()
}

async fn fake_controller(observed: Shared) -> SocketAddr {
    serve(Router::new().fallback(controller).with_state(observed)).await
}

/// A port nobody is listening on right now.
async fn free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap().port()
}

fn settings(controller: SocketAddr, discoverd: String, provider_port: u16) -> Settings {
    Settings {
        controller: ControllerSettings {
            domain: controller.to_string(),
            key: SecretString::from("secret-key".to_string()),
            timeout_secs: 5,
        },
        provider: ProviderSettings {
            addr: "127.0.0.1".to_string(),
            port: provider_port,
        },
        discovery: DiscoverySettings {
            url: Some(discoverd),
            port: 1111,
            heartbeat_secs: 1,
        },
    }
}

#[tokio::test]
async fn test_full_run_over_http() {
    let observed = Shared::default();
    let controller = fake_controller(observed.clone()).await;
    let discoverd = fake_discoverd(observed.clone()).await;
    let port = free_port().await;

    let examples = generate_examples(&settings(controller, format!("http://{}", discoverd), port))
        .await
        .unwrap();

    assert_eq!(examples.len(), 35);
    assert!(examples["provider_resource_create"]
        .starts_with("POST /providers/provider_123/resources HTTP/1.1\n"));
    assert!(examples["key_get"].contains(&format!("Host: {}\n", controller)));

    let observed = observed.lock().await;
    // The controller reached the mock provider through its registered address
    assert_eq!(observed.provisioned_env, Some(json!({ "some": "data" })));

    let provider_addr = format!("127.0.0.1:{}", port);
    let (service, id, body) = &observed.instance_puts[0];
    assert!(service.starts_with("example-provider-"));
    assert_eq!(id, &instance_id(&provider_addr));
    assert_eq!(body["addr"], provider_addr.as_str());

    let last = observed.controller_requests.last().unwrap();
    assert_eq!(last, &("DELETE".to_string(), "/apps/app_123".to_string()));
}

#[tokio::test]
async fn test_heartbeat_keeps_provider_registered() {
    let observed = Shared::default();
    let controller = fake_controller(observed.clone()).await;
    let discoverd = fake_discoverd(observed.clone()).await;
    let port = free_port().await;

    generate_examples(&settings(controller, format!("http://{}", discoverd), port))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(2500)).await;

    let puts = observed.lock().await.instance_puts.len();
    assert!(puts >= 2, "expected heartbeat re-registrations, saw {}", puts);
}

#[tokio::test]
async fn test_unreachable_discovery_fails_before_any_scenario() {
    let observed = Shared::default();
    let controller = fake_controller(observed.clone()).await;
    let port = free_port().await;
    let nowhere = format!("http://127.0.0.1:{}", free_port().await);

    assert!(generate_examples(&settings(controller, nowhere, port)).await.is_err());
    assert!(observed.lock().await.controller_requests.is_empty());
}

#[tokio::test]
async fn test_provider_bind_failure_fails_before_any_scenario() {
    let observed = Shared::default();
    let controller = fake_controller(observed.clone()).await;
    let discoverd = fake_discoverd(observed.clone()).await;

    // Hold the provider port on the address the provider binds
    let blocker = TcpListener::bind("0.0.0.0:0").await.unwrap();
    let port = blocker.local_addr().unwrap().port();

    let result = generate_examples(&settings(controller, format!("http://{}", discoverd), port)).await;
    assert!(result.is_err());
    assert!(observed.lock().await.controller_requests.is_empty());
}
