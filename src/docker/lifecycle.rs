// ABOUTME: Container lifecycle manager: pull, create, start, stop, remove, inspect and log containers
// Holds the validated settings and the single engine connection; no container state is tracked here

use super::engine::{BollardEngine, CreateRequest, Engine, PullRequest};
use super::error::LifecycleError;
use super::log_stream::LogStream;
use crate::config::{self, ValidatedConfig};
use bollard::models::ContainerInspectResponse;
use futures_util::stream::StreamExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, error, info};
use url::Url;

/// The engine's full status and metadata snapshot for one container
pub type ContainerInspection = ContainerInspectResponse;

/// Opaque identifier the engine assigned to a container
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerHandle(String);

impl ContainerHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ContainerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ContainerHandle {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for ContainerHandle {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Whether an inspection reports the container as running
pub fn is_running(inspection: &ContainerInspection) -> bool {
    inspection
        .state
        .as_ref()
        .and_then(|state| state.running)
        .unwrap_or(false)
}

/// Serialize environment pairs as `NAME=value`, preserving order.
///
/// Returns `None` for an empty slice so no environment is sent at all.
pub fn environment_entries(env_vars: &[(String, String)]) -> Option<Vec<String>> {
    if env_vars.is_empty() {
        return None;
    }
    Some(env_vars.iter().map(|(name, value)| format!("{}={}", name, value)).collect())
}

/// Sequences container lifecycle operations against one engine connection.
///
/// Each operation issues a single engine request (`create_container` pulls first)
/// and surfaces engine failures unchanged. Container transitions are not checked
/// locally; the engine is the authority. The connection is released when the
/// manager is dropped.
#[derive(Debug)]
pub struct ContainerLifecycleManager<E = BollardEngine> {
    config: ValidatedConfig,
    engine: E,
}

impl ContainerLifecycleManager<BollardEngine> {
    /// Connect to the engine described by already validated settings
    pub async fn connect(config: ValidatedConfig) -> Result<Self, LifecycleError> {
        let engine = BollardEngine::connect(&config).await?;
        Ok(Self { config, engine })
    }

    /// Validate a raw settings mapping, then connect
    pub async fn from_settings(settings: &HashMap<String, String>) -> Result<Self, LifecycleError> {
        let config = config::validate(settings)?;
        Self::connect(config).await
    }
}

impl<E: Engine> ContainerLifecycleManager<E> {
    /// Use an existing engine handle
    pub const fn with_engine(config: ValidatedConfig, engine: E) -> Self {
        Self { config, engine }
    }

    pub const fn config(&self) -> &ValidatedConfig {
        &self.config
    }

    /// Pull `image:tag` and wait for the engine to close the progress feed.
    ///
    /// Every progress line is logged in order. There is no timeout and no
    /// content-based early exit: an engine that never closes the feed blocks
    /// this call, so callers needing a bound must wrap it themselves.
    pub async fn pull_image(&self, image: &str, tag: &str) -> Result<(), LifecycleError> {
        info!("Pulling image {}:{}", image, tag);

        let server_address = Some(self.config.server_address())
            .filter(|addr| !addr.is_empty())
            .map(str::to_string);
        let request = PullRequest {
            image: image.to_string(),
            tag: tag.to_string(),
            server_address,
        };

        let mut progress = LogStream::new(self.engine.pull_image(&request));
        while let Some(line) = progress.next().await {
            match line {
                Ok(line) => info!("{}", line),
                Err(e) => {
                    error!("Failed to pull image {}:{}: {}", image, tag, e);
                    return Err(e);
                }
            }
        }
        progress.close();

        info!("Done pulling image {}:{}", image, tag);
        Ok(())
    }

    /// Pull the image, then create a container from it.
    ///
    /// The create request is never sent if the pull fails. Environment pairs are
    /// passed as `NAME=value` in the given order, and every exposed port is
    /// published to a host-assigned port once the container starts.
    pub async fn create_container(
        &self,
        image: &str,
        tag: &str,
        env_vars: &[(String, String)],
    ) -> Result<ContainerHandle, LifecycleError> {
        self.pull_image(image, tag).await?;

        let request = CreateRequest {
            image: format!("{}:{}", image, tag),
            env: environment_entries(env_vars),
            publish_all_ports: true,
        };

        let id = self
            .engine
            .create_container(&request)
            .await
            .map_err(LifecycleError::EngineOperation)?;

        info!("Created container {} from {}", id, request.image);
        Ok(ContainerHandle::from(id))
    }

    pub async fn start_container(&self, container: &ContainerHandle) -> Result<(), LifecycleError> {
        info!("Starting container {}", container);
        self.engine
            .start_container(container.as_str())
            .await
            .map_err(LifecycleError::EngineOperation)
    }

    pub async fn stop_container(&self, container: &ContainerHandle) -> Result<(), LifecycleError> {
        info!("Stopping container {}", container);
        self.engine
            .stop_container(container.as_str())
            .await
            .map_err(LifecycleError::EngineOperation)
    }

    /// Remove the container. Whether a running container can be removed is up to the engine.
    pub async fn delete_container(&self, container: &ContainerHandle) -> Result<(), LifecycleError> {
        info!("Removing container {}", container);
        self.engine
            .remove_container(container.as_str())
            .await
            .map_err(LifecycleError::EngineOperation)
    }

    pub async fn inspect_container(
        &self,
        container: &ContainerHandle,
    ) -> Result<ContainerInspection, LifecycleError> {
        debug!("Inspecting container {}", container);
        self.engine
            .inspect_container(container.as_str())
            .await
            .map_err(LifecycleError::EngineOperation)
    }

    /// Follow the container's combined stdout/stderr from the start of its history.
    ///
    /// Nothing is read here. The stream ends only when the engine closes the
    /// feed; the caller owns closing it earlier.
    pub fn log_container(&self, container: &ContainerHandle) -> LogStream {
        debug!("Following logs for container {}", container);
        LogStream::new(self.engine.logs(container.as_str()))
    }

    /// Host component of the configured endpoint URI. Makes no engine call.
    pub fn get_host(&self) -> Result<String, LifecycleError> {
        endpoint_host(self.config.endpoint_uri())
    }
}

/// Host component of an endpoint URI such as `tcp://localhost:2375`
pub fn endpoint_host(uri: &str) -> Result<String, LifecycleError> {
    let endpoint = Url::parse(uri).map_err(|source| LifecycleError::InvalidEndpoint {
        uri: uri.to_string(),
        source,
    })?;

    endpoint
        .host_str()
        .filter(|host| !host.is_empty())
        .map(str::to_string)
        .ok_or_else(|| LifecycleError::EndpointHostMissing(uri.to_string()))
}
