//! The ordered list of scenarios and its ordering rules.

use super::registry::ResourceKind;
use super::scenarios;
use super::ScenarioContext;
use futures::future::BoxFuture;
use std::collections::HashSet;
use thiserror::Error;

/// A scenario body. Resolves to the identifier it created, if any.
pub type Operation = for<'a> fn(&'a ScenarioContext) -> BoxFuture<'a, anyhow::Result<Option<String>>>;

#[derive(Clone)]
pub struct Scenario {
    pub name: &'static str,
    pub operation: Operation,
    /// Kinds that must be in the registry before this runs
    pub requires: &'static [ResourceKind],
    /// Kind the returned identifier is stored under
    pub produces: Option<ResourceKind>,
    /// Failure aborts the run when set
    pub required: bool,
}

impl Scenario {
    pub fn new(name: &'static str, operation: Operation) -> Self {
        Self {
            name,
            operation,
            requires: &[],
            produces: None,
            required: false,
        }
    }

    pub fn requires(mut self, kinds: &'static [ResourceKind]) -> Self {
        self.requires = kinds;
        self
    }

    /// Mark as the producer of `kind`. Producers are always required.
    pub fn produces(mut self, kind: ResourceKind) -> Self {
        self.produces = Some(kind);
        self.required = true;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("produces", &self.produces)
            .field("required", &self.required)
            .finish()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogueError {
    #[error("Duplicate scenario name: {0}")]
    DuplicateName(&'static str),

    #[error("Scenario {scenario} needs {kind} but no earlier scenario produces it")]
    UnsatisfiedDependency {
        scenario: &'static str,
        kind: ResourceKind,
    },

    #[error("Scenario {0} must run last")]
    NotLast(&'static str),

    #[error("Catalogue is empty")]
    Empty,
}

#[derive(Debug, Clone)]
pub struct Catalogue {
    scenarios: Vec<Scenario>,
}

/// The scenario that tears everything down.
pub const FINAL_SCENARIO: &str = "app_delete";

impl Catalogue {
    pub fn new(scenarios: Vec<Scenario>) -> Self {
        Self { scenarios }
    }

    /// The full documentation run.
    pub fn standard() -> Self {
        use ResourceKind::*;

        Self::new(vec![
            Scenario::new("key_create", scenarios::key_create).produces(Key),
            Scenario::new("key_get", scenarios::key_get).requires(&[Key]),
            Scenario::new("key_list", scenarios::key_list),
            Scenario::new("key_delete", scenarios::key_delete).requires(&[Key]),
            Scenario::new("app_create", scenarios::app_create).produces(App),
            Scenario::new("app_get", scenarios::app_get).requires(&[App]),
            Scenario::new("app_list", scenarios::app_list),
            Scenario::new("app_update", scenarios::app_update).requires(&[App]),
            Scenario::new("app_resource_list", scenarios::app_resource_list).requires(&[App]),
            Scenario::new("route_create", scenarios::route_create)
                .requires(&[App])
                .produces(Route),
            Scenario::new("route_get", scenarios::route_get).requires(&[App, Route]),
            Scenario::new("route_list", scenarios::route_list).requires(&[App]),
            Scenario::new("route_delete", scenarios::route_delete).requires(&[App, Route]),
            Scenario::new("artifact_create", scenarios::artifact_create).produces(Artifact),
            Scenario::new("release_create", scenarios::release_create)
                .requires(&[Artifact])
                .produces(Release),
            Scenario::new("artifact_list", scenarios::artifact_list),
            Scenario::new("release_list", scenarios::release_list),
            Scenario::new("app_release_set", scenarios::app_release_set).requires(&[App, Release]),
            Scenario::new("app_release_get", scenarios::app_release_get).requires(&[App]),
            Scenario::new("formation_put", scenarios::formation_put)
                .requires(&[App, Release])
                .produces(Formation),
            Scenario::new("formation_get", scenarios::formation_get).requires(&[App, Release]),
            Scenario::new("formation_list", scenarios::formation_list).requires(&[App]),
            Scenario::new("formation_delete", scenarios::formation_delete)
                .requires(&[App, Release]),
            Scenario::new("job_run", scenarios::job_run)
                .requires(&[App, Release])
                .produces(Job),
            Scenario::new("job_list", scenarios::job_list).requires(&[App]),
            Scenario::new("job_update", scenarios::job_update).requires(&[App, Release, Job]),
            Scenario::new("job_log", scenarios::job_log).requires(&[App, Job]),
            Scenario::new("job_delete", scenarios::job_delete).requires(&[App, Job]),
            Scenario::new("provider_create", scenarios::provider_create).produces(Provider),
            Scenario::new("provider_get", scenarios::provider_get).requires(&[Provider]),
            Scenario::new("provider_list", scenarios::provider_list),
            Scenario::new("provider_resource_create", scenarios::provider_resource_create)
                .requires(&[Provider])
                .produces(ProviderResource),
            Scenario::new("provider_resource_get", scenarios::provider_resource_get)
                .requires(&[Provider, ProviderResource]),
            Scenario::new("provider_resource_list", scenarios::provider_resource_list)
                .requires(&[Provider]),
            Scenario::new(FINAL_SCENARIO, scenarios::app_delete).requires(&[App]),
        ])
    }

    /// Check names are unique, every dependency is produced by an earlier
    /// scenario, and the app teardown (if present) runs last.
    pub fn validate(&self) -> Result<(), CatalogueError> {
        if self.scenarios.is_empty() {
            return Err(CatalogueError::Empty);
        }

        let mut names = HashSet::new();
        let mut produced = HashSet::new();
        for scenario in &self.scenarios {
            if !names.insert(scenario.name) {
                return Err(CatalogueError::DuplicateName(scenario.name));
            }
            for kind in scenario.requires {
                if !produced.contains(kind) {
                    return Err(CatalogueError::UnsatisfiedDependency {
                        scenario: scenario.name,
                        kind: *kind,
                    });
                }
            }
            if let Some(kind) = scenario.produces {
                produced.insert(kind);
            }
        }

        if let Some(position) = self.position(FINAL_SCENARIO) {
            if position != self.scenarios.len() - 1 {
                return Err(CatalogueError::NotLast(FINAL_SCENARIO));
            }
        }
        Ok(())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.scenarios.iter().position(|s| s.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.scenarios.iter().map(|s| s.name).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scenario> {
        self.scenarios.iter()
    }

    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }
}
