// ABOUTME: Error types for engine connection and container lifecycle operations
// Engine failures are carried unmodified; nothing here retries or reinterprets them

use crate::config::MissingConfigurationError;
use thiserror::Error;

pub type DockerError = bollard::errors::Error;

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid engine API version '{0}': expected MAJOR.MINOR")]
    InvalidApiVersion(String),
    #[error("Invalid engine endpoint '{uri}': {reason}")]
    InvalidEndpoint { uri: String, reason: String },
    #[error("Docker connection error: {0}")]
    Transport(#[from] DockerError),
}

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error(transparent)]
    MissingConfiguration(#[from] MissingConfigurationError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error("Feed read error: {0}")]
    Feed(#[source] DockerError),
    #[error("Container operation failed: {0}")]
    EngineOperation(#[source] DockerError),
    #[error("Invalid endpoint URI '{uri}': {source}")]
    InvalidEndpoint {
        uri: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Endpoint URI '{0}' has no host component")]
    EndpointHostMissing(String),
}

impl LifecycleError {
    /// HTTP status reported by the engine, when the failure came from an engine response
    pub fn engine_status(&self) -> Option<u16> {
        match self {
            Self::Feed(DockerError::DockerResponseServerError { status_code, .. })
            | Self::EngineOperation(DockerError::DockerResponseServerError { status_code, .. }) => {
                Some(*status_code)
            }
            _ => None,
        }
    }
}
