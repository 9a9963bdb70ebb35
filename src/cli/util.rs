// ABOUTME: Shared CLI utilities for settings loading, engine connection and argument parsing

use anyhow::{anyhow, Context, Result};
use std::path::Path;

use crate::config::{self, EngineSettings, ValidatedConfig};
use crate::docker::ContainerLifecycleManager;

/// Load settings from files and environment, then validate them
pub fn load_config(explicit: Option<&Path>) -> Result<ValidatedConfig> {
    let settings = EngineSettings::load(explicit)?;
    let config = config::validate(&settings.to_map()).context(
        "Set it in the [engine] table of a config file or via BERTH_ENGINE_* environment variables",
    )?;

    Ok(match settings.request_timeout_secs {
        Some(secs) => config.with_request_timeout(secs),
        None => config,
    })
}

/// Load settings and connect to the engine
pub async fn connect(explicit: Option<&Path>) -> Result<ContainerLifecycleManager> {
    let config = load_config(explicit)?;
    let uri = config.endpoint_uri().to_string();
    ContainerLifecycleManager::connect(config)
        .await
        .with_context(|| format!("Failed to connect to engine at {uri}"))
}

/// Parse a `NAME=VALUE` pair; only the first '=' separates name from value
pub fn parse_env_pair(raw: &str) -> Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow!("expected NAME=VALUE, got '{raw}'"))?;
    if name.is_empty() {
        return Err(anyhow!("environment variable name is empty in '{raw}'"));
    }
    Ok((name.to_string(), value.to_string()))
}
