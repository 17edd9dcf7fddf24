use anyhow::Context;
use config::{Config, Environment, File};
use reqwest::Url;
use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

pub mod validator;

/// Basename of the optional configuration file (any format `config` supports).
pub const CONFIG_FILE: &str = "controller-examples";

/// Conventional unprefixed variables and the settings they override.
const LEGACY_ENV: [(&str, &str); 5] = [
    ("CONTROLLER_DOMAIN", "controller.domain"),
    ("CONTROLLER_KEY", "controller.key"),
    ("EXTERNAL_IP", "provider.addr"),
    ("PORT", "provider.port"),
    ("DISCOVERD", "discovery.url"),
];

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub controller: ControllerSettings,
    pub provider: ProviderSettings,
    pub discovery: DiscoverySettings,
}

#[derive(Debug, Deserialize)]
pub struct ControllerSettings {
    /// Host (and optional port) of the controller API
    pub domain: String,
    #[serde(deserialize_with = "deserialize_secret")]
    pub key: SecretString,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct ProviderSettings {
    /// Address the controller can reach this process on
    pub addr: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct DiscoverySettings {
    #[serde(default)]
    pub url: Option<String>,
    pub port: u16,
    pub heartbeat_secs: u64,
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}

impl ControllerSettings {
    pub fn base_url(&self) -> String {
        if self.domain.contains("://") {
            self.domain.clone()
        } else {
            format!("http://{}", self.domain)
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl ProviderSettings {
    /// Listen on every interface; the controller reaches us via `addr`.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.port))
    }

    /// `addr:port` as announced to discovery.
    pub fn external_addr(&self) -> String {
        format!("{}:{}", self.addr, self.port)
    }
}

impl DiscoverySettings {
    pub fn heartbeat(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs)
    }
}

impl Settings {
    /// Load from `controller-examples.*` in the working directory and the
    /// process environment.
    pub fn new() -> Result<Self, anyhow::Error> {
        Self::load(Path::new(CONFIG_FILE), None)
    }

    /// Load from `file` (optional, any supported extension) and `vars`, or the
    /// process environment when `vars` is `None`.
    ///
    /// Precedence, lowest first: defaults, file, `EXAMPLES_*` variables,
    /// conventional unprefixed variables.
    pub fn load(file: &Path, vars: Option<HashMap<String, String>>) -> Result<Self, anyhow::Error> {
        let lookup = |name: &str| match &vars {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        };

        let mut builder = Config::builder()
            .set_default("controller.timeout_secs", 60)?
            .set_default("provider.addr", "127.0.0.1")?
            .set_default("provider.port", 4456)?
            .set_default("discovery.port", 1111)?
            .set_default("discovery.heartbeat_secs", 5)?
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix("EXAMPLES")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true)
                    .source(vars.clone()),
            );

        for (var, key) in LEGACY_ENV {
            builder = builder.set_override_option(key, lookup(var))?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;

        validator::ConfigValidator::validate(&settings).map_err(|errors| {
            let error_messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
            anyhow::anyhow!(
                "Configuration validation failed:\n{}",
                error_messages.join("\n")
            )
        })?;

        Ok(settings)
    }

    /// `discovery.url` when set, otherwise the controller's host on
    /// `discovery.port`.
    pub fn discovery_url(&self) -> Result<String, anyhow::Error> {
        match &self.discovery.url {
            Some(url) if url.contains("://") => Ok(url.clone()),
            Some(host) => Ok(format!("http://{}", host)),
            None => {
                let controller = Url::parse(&self.controller.base_url()).with_context(|| {
                    format!("Invalid controller domain: {}", self.controller.domain)
                })?;
                let host = controller.host_str().ok_or_else(|| {
                    anyhow::anyhow!("Controller domain has no host: {}", self.controller.domain)
                })?;
                Ok(format!("http://{}:{}", host, self.discovery.port))
            }
        }
    }
}
