//! Error types shared by the transport, client and discovery layers

use reqwest::StatusCode;
use thiserror::Error;

/// Failures raised while moving bytes to and from a remote endpoint
#[derive(Debug, Error)]
pub enum TransportError {
    /// Error reported by the HTTP stack
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Connection could not be established or was dropped
    #[error("Connection error: {0}")]
    Connection(String),
}

/// Errors returned by typed control-plane calls
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Controller answered with a non-success status
    #[error("Unexpected status {status} from {method} {path}: {body}")]
    Status {
        method: String,
        path: String,
        status: StatusCode,
        body: String,
    },

    /// Response body did not match the expected shape
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Base URL cannot carry a path
    #[error("Invalid controller URL: {0}")]
    InvalidUrl(String),

    #[error("Invalid credentials header: {0}")]
    InvalidCredentials(#[from] reqwest::header::InvalidHeaderValue),
}

/// Errors talking to the service registry
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Discovery transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Discovery returned status {status} for {operation}")]
    Status {
        operation: String,
        status: StatusCode,
    },

    #[error("Invalid discovery URL: {0}")]
    InvalidUrl(String),
}
