//! Identifiers produced by earlier scenarios, keyed by resource kind.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    App,
    Key,
    Route,
    Artifact,
    Release,
    Formation,
    Job,
    Provider,
    ProviderResource,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 9] = [
        ResourceKind::App,
        ResourceKind::Key,
        ResourceKind::Route,
        ResourceKind::Artifact,
        ResourceKind::Release,
        ResourceKind::Formation,
        ResourceKind::Job,
        ResourceKind::Provider,
        ResourceKind::ProviderResource,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            ResourceKind::App => "app",
            ResourceKind::Key => "key",
            ResourceKind::Route => "route",
            ResourceKind::Artifact => "artifact",
            ResourceKind::Release => "release",
            ResourceKind::Formation => "formation",
            ResourceKind::Job => "job",
            ResourceKind::Provider => "provider",
            ResourceKind::ProviderResource => "provider_resource",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("No {0} identifier has been recorded yet")]
    Missing(ResourceKind),

    #[error("Refusing to record an empty {0} identifier")]
    Empty(ResourceKind),
}

/// Last identifier seen per resource kind.
///
/// Writes overwrite; nothing is ever removed. A deleted resource keeps its
/// stale entry, so a scenario reading a kind after that kind's delete
/// scenario would target a resource that no longer exists.
#[derive(Debug, Default, Clone)]
pub struct ResourceRegistry {
    ids: HashMap<String, String>,
}

macro_rules! typed_accessors {
    ($($kind:ident => $get:ident, $set:ident;)*) => {
        $(
            pub fn $get(&self) -> Result<&str, RegistryError> {
                self.get(ResourceKind::$kind)
            }

            pub fn $set(&mut self, id: impl Into<String>) -> Result<Option<String>, RegistryError> {
                self.set(ResourceKind::$kind, id)
            }
        )*
    };
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `id` for `kind`, returning the identifier it replaced.
    pub fn set(
        &mut self,
        kind: ResourceKind,
        id: impl Into<String>,
    ) -> Result<Option<String>, RegistryError> {
        let id = id.into();
        if id.is_empty() {
            return Err(RegistryError::Empty(kind));
        }
        Ok(self.ids.insert(kind.label().to_string(), id))
    }

    pub fn get(&self, kind: ResourceKind) -> Result<&str, RegistryError> {
        self.ids
            .get(kind.label())
            .map(String::as_str)
            .ok_or(RegistryError::Missing(kind))
    }

    pub fn contains(&self, kind: ResourceKind) -> bool {
        self.ids.contains_key(kind.label())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    typed_accessors! {
        App => app, set_app;
        Key => key, set_key;
        Route => route, set_route;
        Artifact => artifact, set_artifact;
        Release => release, set_release;
        Formation => formation, set_formation;
        Job => job, set_job;
        Provider => provider, set_provider;
        ProviderResource => provider_resource, set_provider_resource;
    }
}
