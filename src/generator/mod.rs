//! Example generation
//!
//! The [`Generator`] walks a [`Catalogue`] one scenario at a time. After each
//! scenario it drains the recorder and renders the first captured request as
//! that scenario's example. Identifiers created along the way are threaded to
//! later scenarios through the [`ResourceRegistry`] held by the
//! [`ScenarioContext`].

pub mod catalogue;
pub mod registry;
pub mod render;
pub mod scenarios;

pub use catalogue::{Catalogue, CatalogueError, Scenario};
pub use registry::{RegistryError, ResourceKind, ResourceRegistry};

use crate::adapters::controller_client::ControllerClient;
use crate::adapters::recorder::Recorder;
use crate::domain::ServiceDiscovery;
use anyhow::{anyhow, bail, Context};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Everything a scenario may touch.
pub struct ScenarioContext {
    pub client: ControllerClient,
    pub registry: ResourceRegistry,
    pub discovery: Arc<dyn ServiceDiscovery>,
    /// Address the mock provider is reachable on from the controller
    pub provider_addr: String,
}

impl ScenarioContext {
    pub fn new(
        client: ControllerClient,
        discovery: Arc<dyn ServiceDiscovery>,
        provider_addr: impl Into<String>,
    ) -> Self {
        Self {
            client,
            registry: ResourceRegistry::new(),
            discovery,
            provider_addr: provider_addr.into(),
        }
    }
}

pub struct Generator {
    context: ScenarioContext,
    recorder: Recorder,
}

impl Generator {
    /// `recorder` must be the one wrapping the context client's transport.
    pub fn new(context: ScenarioContext, recorder: Recorder) -> Self {
        Self { context, recorder }
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.context.registry
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    /// Run every scenario in order and return scenario name → rendered example.
    pub async fn run(&mut self, catalogue: &Catalogue) -> anyhow::Result<BTreeMap<String, String>> {
        catalogue.validate()?;

        let earlier = self.recorder.drain_since_checkpoint().await;
        if !earlier.is_empty() {
            debug!(count = earlier.len(), "ignoring exchanges recorded before the first scenario");
        }

        let mut examples = BTreeMap::new();
        for scenario in catalogue.iter() {
            let example = self.run_scenario(scenario).await?;
            examples.insert(scenario.name.to_string(), example);
        }

        info!(count = examples.len(), "generated examples");
        Ok(examples)
    }

    /// Execute one scenario and render its canonical request.
    pub async fn run_scenario(&mut self, scenario: &Scenario) -> anyhow::Result<String> {
        for kind in scenario.requires {
            self.context
                .registry
                .get(*kind)
                .with_context(|| format!("Scenario {} cannot run", scenario.name))?;
        }

        info!(scenario = scenario.name, "running scenario");
        match (scenario.operation)(&self.context).await {
            Ok(produced) => self.store(scenario, produced)?,
            Err(e) if scenario.required => {
                return Err(e.context(format!("Required scenario {} failed", scenario.name)));
            }
            Err(e) => warn!(scenario = scenario.name, "scenario failed: {:#}", e),
        }

        let captured = self.recorder.drain_issued_since_checkpoint().await;
        let first = captured
            .first()
            .ok_or_else(|| anyhow!("Scenario {} issued no requests", scenario.name))?;
        if captured.len() > 1 {
            debug!(
                scenario = scenario.name,
                extra = captured.len() - 1,
                "keeping only the first request"
            );
        }

        Ok(render::render_request(&first.request))
    }

    fn store(&mut self, scenario: &Scenario, produced: Option<String>) -> anyhow::Result<()> {
        match (scenario.produces, produced) {
            (Some(kind), Some(id)) => {
                info!(scenario = scenario.name, %kind, id = %id, "recorded identifier");
                self.context.registry.set(kind, id)?;
            }
            (Some(kind), None) => {
                bail!("Scenario {} did not return a {} identifier", scenario.name, kind)
            }
            (None, Some(id)) => {
                debug!(scenario = scenario.name, id = %id, "scenario declares no kind; identifier dropped")
            }
            (None, None) => {}
        }
        Ok(())
    }
}
