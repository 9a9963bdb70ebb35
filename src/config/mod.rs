// ABOUTME: Engine connection configuration and validation
// Checks that all required engine settings are present before any engine contact

pub mod settings;

pub use settings::EngineSettings;

use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tracing::error;

/// Engine API version, e.g. `1.22`
pub const ENGINE_VERSION: &str = "engine.version";

/// Engine endpoint URI, e.g. `tcp://localhost:2375`
pub const ENGINE_URI: &str = "engine.uri";

/// Registry server address used when pulling images
pub const ENGINE_SERVER_ADDRESS: &str = "engine.server_address";

/// Directory holding `key.pem`, `cert.pem` and `ca.pem` for TLS
pub const ENGINE_CERT_PATH: &str = "engine.cert_path";

/// Setting keys required to initialize the engine client, in validation order.
pub const REQUIRED_KEYS: [&str; 4] = [
    ENGINE_VERSION,
    ENGINE_URI,
    ENGINE_SERVER_ADDRESS,
    ENGINE_CERT_PATH,
];

/// Per-request setup timeout handed to the engine transport (bollard's default)
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

/// Returns the setting keys that are required to initialize the engine client.
pub fn required_keys() -> &'static [&'static str] {
    &REQUIRED_KEYS
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Not all required settings were set to initialize the engine client: {key} is missing")]
pub struct MissingConfigurationError {
    pub key: &'static str,
}

/// The four engine settings, guaranteed present.
///
/// Values are kept exactly as supplied. An empty string is a valid value here;
/// malformed values only surface when the engine connection is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidatedConfig {
    api_version: String,
    endpoint_uri: String,
    server_address: String,
    cert_path: String,
    request_timeout_secs: u64,
}

impl ValidatedConfig {
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    pub fn endpoint_uri(&self) -> &str {
        &self.endpoint_uri
    }

    pub fn server_address(&self) -> &str {
        &self.server_address
    }

    pub fn cert_path(&self) -> &str {
        &self.cert_path
    }

    pub const fn request_timeout_secs(&self) -> u64 {
        self.request_timeout_secs
    }

    /// Override the transport's request setup timeout.
    ///
    /// This never bounds a streaming feed once the engine has answered.
    #[must_use]
    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }
}

/// Validate a raw settings mapping.
///
/// Keys are checked in [`REQUIRED_KEYS`] order and the first absent one is reported.
pub fn validate(
    settings: &HashMap<String, String>,
) -> Result<ValidatedConfig, MissingConfigurationError> {
    Ok(ValidatedConfig {
        api_version: require(settings, ENGINE_VERSION)?,
        endpoint_uri: require(settings, ENGINE_URI)?,
        server_address: require(settings, ENGINE_SERVER_ADDRESS)?,
        cert_path: require(settings, ENGINE_CERT_PATH)?,
        request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
    })
}

fn require(
    settings: &HashMap<String, String>,
    key: &'static str,
) -> Result<String, MissingConfigurationError> {
    settings.get(key).cloned().ok_or_else(|| {
        let err = MissingConfigurationError { key };
        error!("{}", err);
        err
    })
}
