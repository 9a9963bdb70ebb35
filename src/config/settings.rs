// ABOUTME: Loads the raw engine settings from TOML files and BERTH_ENGINE_* environment variables
// Absent values stay absent so validation can name them

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{ENGINE_CERT_PATH, ENGINE_SERVER_ADDRESS, ENGINE_URI, ENGINE_VERSION};

const ENV_PREFIX: &str = "BERTH_ENGINE_";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    engine: EngineSettings,
}

/// Engine settings as read from the `[engine]` table of a config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Engine API version, e.g. "1.22"
    pub version: Option<String>,

    /// Engine endpoint, e.g. "tcp://localhost:2375" or "unix:///var/run/docker.sock"
    pub uri: Option<String>,

    /// Registry server address sent with image pulls
    pub server_address: Option<String>,

    /// Directory containing key.pem, cert.pem and ca.pem
    pub cert_path: Option<String>,

    /// Request setup timeout in seconds
    pub request_timeout_secs: Option<u64>,
}

impl EngineSettings {
    /// Load settings from the default locations, an optional explicit file,
    /// and the process environment, in increasing order of precedence.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut settings = Self::default();

        for path in Self::get_config_paths() {
            if path.exists() {
                settings.merge(Self::from_file(&path)?);
            }
        }

        if let Some(path) = explicit {
            settings.merge(Self::from_file(path)?);
        }

        settings.apply_env(std::env::vars());
        Ok(settings)
    }

    /// Read the `[engine]` table of a single TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let file: SettingsFile = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        debug!("Loaded engine settings from {}", path.display());
        Ok(file.engine)
    }

    /// Config file paths, lowest precedence first
    fn get_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("/etc/berth/config.toml")];

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".berth").join("config.toml"));
        }

        if let Ok(cwd) = std::env::current_dir() {
            paths.push(cwd.join(".berth").join("config.toml"));
        }

        paths
    }

    /// Values present in `other` replace ours
    pub fn merge(&mut self, other: Self) {
        if other.version.is_some() {
            self.version = other.version;
        }
        if other.uri.is_some() {
            self.uri = other.uri;
        }
        if other.server_address.is_some() {
            self.server_address = other.server_address;
        }
        if other.cert_path.is_some() {
            self.cert_path = other.cert_path;
        }
        if other.request_timeout_secs.is_some() {
            self.request_timeout_secs = other.request_timeout_secs;
        }
    }

    /// Apply `BERTH_ENGINE_VERSION`, `BERTH_ENGINE_URI`, `BERTH_ENGINE_SERVER_ADDRESS`,
    /// `BERTH_ENGINE_CERT_PATH` and `BERTH_ENGINE_REQUEST_TIMEOUT_SECS` overrides.
    pub fn apply_env<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "VERSION" => self.version = Some(value),
                "URI" => self.uri = Some(value),
                "SERVER_ADDRESS" => self.server_address = Some(value),
                "CERT_PATH" => self.cert_path = Some(value),
                "REQUEST_TIMEOUT_SECS" => match value.parse() {
                    Ok(secs) => self.request_timeout_secs = Some(secs),
                    Err(_) => debug!("Ignoring non-numeric {}: {}", key, value),
                },
                _ => {}
            }
        }
    }

    /// The raw settings mapping consumed by [`super::validate`]
    pub fn to_map(&self) -> HashMap<String, String> {
        [
            (ENGINE_VERSION, &self.version),
            (ENGINE_URI, &self.uri),
            (ENGINE_SERVER_ADDRESS, &self.server_address),
            (ENGINE_CERT_PATH, &self.cert_path),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
        .collect()
    }
}
