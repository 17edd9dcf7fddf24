//! # Controller Examples
//!
//! Drives a live controller API through a fixed catalogue of calls and
//! captures the first HTTP request each call issues, producing a JSON map of
//! scenario name to raw request text for API documentation.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use controller_examples::config::Settings;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // CONTROLLER_DOMAIN and CONTROLLER_KEY must be set
//!     let settings = Settings::new()?;
//!     println!("{}", settings.controller.base_url());
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **Domain**: request/response types, controller models and the transport seam
//! - **Adapters**: HTTP transport, recorder, controller client, discovery, mock provider
//! - **Generator**: scenario catalogue, resource registry, driver and renderer
//! - **Config**: settings loading and validation

pub mod adapters;
pub mod cli;
pub mod config;
pub mod domain;
pub mod generator;

use crate::adapters::controller_client::ControllerClient;
use crate::adapters::discoverd::DiscoverdClient;
use crate::adapters::http_transport::ReqwestTransport;
use crate::adapters::provider_server::MockProviderServer;
use crate::adapters::recorder::{RecordedOutcome, Recorder, RecordingTransport};
use crate::config::Settings;
use crate::domain::ServiceDiscovery;
use crate::generator::{Catalogue, Generator, ScenarioContext};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Wire the production stack from `settings` and run the standard catalogue.
///
/// Discovery is connected and its heartbeat started, then the mock provider
/// is bound and spawned, all before the first scenario runs. The provider and
/// the heartbeat keep running after this returns.
pub async fn generate_examples(settings: &Settings) -> anyhow::Result<BTreeMap<String, String>> {
    let timeout = settings.controller.timeout();

    let discovery = Arc::new(DiscoverdClient::new(&settings.discovery_url()?, timeout)?);
    discovery.connect().await?;
    let _heartbeat = discovery.clone().spawn_heartbeat(settings.discovery.heartbeat());

    let recorder = Recorder::new();
    let transport = RecordingTransport::new(ReqwestTransport::new(timeout)?, recorder.clone());
    let client = ControllerClient::new(
        &settings.controller.base_url(),
        &settings.controller.key,
        Arc::new(transport),
    )?;

    // Bound before any scenario: the controller may call back at once
    let _provider = MockProviderServer::bind(settings.provider.bind_addr())
        .await?
        .spawn()?;

    let context = ScenarioContext::new(client, discovery, settings.provider.external_addr());
    let mut generator = Generator::new(context, recorder);
    let examples = generator.run(&Catalogue::standard()).await?;

    for exchange in generator.recorder().exchanges().await {
        let outcome = match &exchange.outcome {
            RecordedOutcome::Response { status, .. } => status.to_string(),
            RecordedOutcome::Failed(e) => e.clone(),
        };
        debug!(
            sequence = exchange.sequence,
            method = %exchange.request.method,
            target = %exchange.request.target(),
            %outcome,
            "exchange"
        );
    }

    Ok(examples)
}
