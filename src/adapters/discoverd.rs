//! discoverd registry client
//!
//! Announces service instances over discoverd's HTTP API and keeps them alive
//! with a periodic heartbeat for as long as the process runs.

use crate::domain::{DiscoveryError, ServiceDiscovery};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Serialize;
use md5::{Digest, Md5};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const PROTO: &str = "http";

#[derive(Debug, Clone, Serialize, PartialEq)]
struct Instance {
    id: String,
    addr: String,
    proto: &'static str,
    meta: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq)]
struct Registration {
    service: String,
    addr: String,
}

/// Instance identifier discoverd expects: hex md5 of `{proto}-{addr}`.
/// The registry rejects instances whose id does not match.
pub fn instance_id(addr: &str) -> String {
    Md5::digest(format!("{}-{}", PROTO, addr).as_bytes())
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}

pub struct DiscoverdClient {
    base_url: Url,
    http: Client,
    registrations: RwLock<Vec<Registration>>,
}

impl DiscoverdClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, DiscoveryError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| DiscoveryError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(DiscoveryError::InvalidUrl(base_url.to_string()));
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            http,
            registrations: RwLock::new(Vec::new()),
        })
    }

    fn url(&self, segments: &[&str]) -> Result<Url, DiscoveryError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| DiscoveryError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn ensure_service(&self, service: &str) -> Result<(), DiscoveryError> {
        let response = self
            .http
            .put(self.url(&["services", service])?)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        // An existing service is as good as a new one
        let status = response.status();
        if status.is_success() || status == StatusCode::CONFLICT {
            Ok(())
        } else {
            Err(DiscoveryError::Status {
                operation: format!("create service {}", service),
                status,
            })
        }
    }

    async fn put_instance(&self, registration: &Registration) -> Result<(), DiscoveryError> {
        let instance = Instance {
            id: instance_id(&registration.addr),
            addr: registration.addr.clone(),
            proto: PROTO,
            meta: BTreeMap::new(),
        };
        let url = self.url(&["services", registration.service.as_str(), "instances", instance.id.as_str()])?;
        let response = self.http.put(url).json(&instance).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status {
                operation: format!("register instance of {}", registration.service),
                status,
            });
        }
        debug!(service = %registration.service, addr = %registration.addr, "instance registered");
        Ok(())
    }

    /// Re-register every known instance each `interval` until the process exits.
    pub fn spawn_heartbeat(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; registrations are fresh then
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let registrations = self.registrations.read().await.clone();
                for registration in &registrations {
                    if let Err(e) = self.put_instance(registration).await {
                        warn!(service = %registration.service, "heartbeat failed: {}", e);
                    }
                }
            }
        })
    }

    pub async fn registered_services(&self) -> Vec<String> {
        self.registrations
            .read()
            .await
            .iter()
            .map(|r| r.service.clone())
            .collect()
    }
}

#[async_trait]
impl ServiceDiscovery for DiscoverdClient {
    async fn connect(&self) -> Result<(), DiscoveryError> {
        let response = self.http.get(self.url(&["ping"])?).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status {
                operation: "ping".to_string(),
                status,
            });
        }
        info!(url = %self.base_url, "connected to discoverd");
        Ok(())
    }

    async fn register(&self, service: &str, addr: &str) -> Result<(), DiscoveryError> {
        self.ensure_service(service).await?;

        let registration = Registration {
            service: service.to_string(),
            addr: addr.to_string(),
        };
        self.put_instance(&registration).await?;

        let mut registrations = self.registrations.write().await;
        if !registrations.contains(&registration) {
            registrations.push(registration);
        }
        info!(service, addr, "registered with discoverd");
        Ok(())
    }
}
