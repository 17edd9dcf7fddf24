use secrecy::ExposeSecret;
use thiserror::Error;

use crate::config::{ControllerSettings, DiscoverySettings, ProviderSettings, Settings};

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate(settings: &Settings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = Self::validate_controller(&settings.controller) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_provider(&settings.provider) {
            errors.extend(e);
        }

        if let Err(e) = Self::validate_discovery(&settings.discovery) {
            errors.extend(e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_controller(controller: &ControllerSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if controller.domain.trim().is_empty() {
            errors.push(ValidationError::MissingField("controller.domain".to_string()));
        }

        if controller.key.expose_secret().is_empty() {
            errors.push(ValidationError::MissingField("controller.key".to_string()));
        }

        if controller.timeout_secs == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "controller.timeout_secs".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_provider(provider: &ProviderSettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if provider.addr.trim().is_empty() {
            errors.push(ValidationError::MissingField("provider.addr".to_string()));
        }

        // The port is announced to discovery, so an ephemeral port is no good
        if provider.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "provider.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_discovery(discovery: &DiscoverySettings) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if discovery.port == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "discovery.port".to_string(),
                reason: "Port must be greater than 0".to_string(),
            });
        }

        if discovery.heartbeat_secs == 0 {
            errors.push(ValidationError::InvalidValue {
                field: "discovery.heartbeat_secs".to_string(),
                reason: "Heartbeat interval must be greater than 0".to_string(),
            });
        }

        if let Some(url) = &discovery.url {
            if url.trim().is_empty() {
                errors.push(ValidationError::InvalidValue {
                    field: "discovery.url".to_string(),
                    reason: "URL must not be empty when set".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
