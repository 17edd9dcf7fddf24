#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use controller_examples::adapters::controller_client::ControllerClient;
use controller_examples::adapters::recorder::{Recorder, RecordingTransport};
use controller_examples::domain::{
    DiscoveryError, HttpRequest, HttpResponse, ServiceDiscovery, Transport, TransportError,
};
use controller_examples::generator::{Generator, ScenarioContext};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use secrecy::SecretString;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const BASE_URL: &str = "http://controller.example.com";
pub const PROVIDER_ADDR: &str = "10.0.0.1:4456";

/// Collection segments and the id prefix the fake assigns to new members.
const COLLECTIONS: [(&str, &str); 8] = [
    ("keys", "key"),
    ("apps", "app"),
    ("routes", "route"),
    ("artifacts", "artifact"),
    ("releases", "release"),
    ("jobs", "job"),
    ("providers", "provider"),
    ("resources", "resource"),
];

/// In-memory stand-in for the controller API.
///
/// POST to a collection echoes the body back with an id of the form
/// `{kind}_123`. GET on a collection answers `[]`, GET on anything else `{}`.
/// Requests matching `fail_on` get a 500.
#[derive(Clone, Default)]
pub struct FakeController {
    seen: Arc<Mutex<Vec<HttpRequest>>>,
    fail_on: Option<(Method, String)>,
}

impl FakeController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(method: Method, path: &str) -> Self {
        Self {
            fail_on: Some((method, path.to_string())),
            ..Self::default()
        }
    }

    pub async fn seen(&self) -> Vec<HttpRequest> {
        self.seen.lock().await.clone()
    }

    fn answer(&self, request: &HttpRequest) -> (StatusCode, Bytes) {
        if let Some((method, path)) = &self.fail_on {
            if request.method == *method && request.url.path() == path {
                return (StatusCode::INTERNAL_SERVER_ERROR, Bytes::from_static(b"boom"));
            }
        }
        let (status, body) =
            controller_answer(request.method.as_str(), request.url.path(), &request.body);
        (StatusCode::from_u16(status).unwrap_or(StatusCode::OK), body)
    }
}

/// What the fake controller answers to `method path` with `body`.
pub fn controller_answer(method: &str, path: &str, body: &[u8]) -> (u16, Bytes) {
    let last = path.rsplit('/').next().unwrap_or_default();
    let collection = COLLECTIONS.iter().find(|(name, _)| *name == last);

    match method {
        "GET" if last == "log" => (200, Bytes::from_static(b"Hello!\n")),
        "GET" if collection.is_some() || last == "formations" => (200, Bytes::from_static(b"[]")),
        "GET" => (200, Bytes::from_static(b"{}")),
        "POST" => {
            let mut body: Value = serde_json::from_slice(body).unwrap_or(json!({}));
            if let (Some((_, prefix)), Some(object)) = (collection, body.as_object_mut()) {
                object.insert("id".to_string(), json!(format!("{}_123", prefix)));
            }
            (200, Bytes::from(body.to_string()))
        }
        "PUT" => (200, Bytes::copy_from_slice(body)),
        _ => (200, Bytes::new()),
    }
}

#[async_trait]
impl Transport for FakeController {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let (status, body) = self.answer(&request);
        self.seen.lock().await.push(request);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

/// Discovery double that remembers every registration.
#[derive(Default)]
pub struct FakeDiscovery {
    pub registrations: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl ServiceDiscovery for FakeDiscovery {
    async fn connect(&self) -> Result<(), DiscoveryError> {
        Ok(())
    }

    async fn register(&self, service: &str, addr: &str) -> Result<(), DiscoveryError> {
        self.registrations
            .lock()
            .await
            .push((service.to_string(), addr.to_string()));
        Ok(())
    }
}

/// A generator wired to `controller` through a recording transport.
pub fn generator(controller: FakeController, discovery: Arc<FakeDiscovery>) -> Generator {
    let recorder = Recorder::new();
    let transport = RecordingTransport::new(controller, recorder.clone());
    let key = SecretString::from("secret-key".to_string());
    let client = ControllerClient::new(BASE_URL, &key, Arc::new(transport))
        .expect("valid controller client");
    let context = ScenarioContext::new(client, discovery, PROVIDER_ADDR);
    Generator::new(context, recorder)
}
