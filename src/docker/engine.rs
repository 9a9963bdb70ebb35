// ABOUTME: The engine seam used by the lifecycle manager and its bollard-backed implementation
// Builds the single Docker client from validated settings (HTTP, TLS or unix socket)

use super::error::{ConnectionError, DockerError};
use crate::config::ValidatedConfig;
use async_trait::async_trait;
use bollard::auth::DockerCredentials;
use bollard::container::{
    Config, CreateContainerOptions, LogOutput, LogsOptions, RemoveContainerOptions,
    StartContainerOptions, StopContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{ContainerInspectResponse, CreateImageInfo, HostConfig};
use bollard::{ClientVersion, Docker};
use futures_util::stream::{BoxStream, StreamExt};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

/// Raw byte feed produced by the engine (pull progress or container output)
pub type Feed = BoxStream<'static, Result<Vec<u8>, DockerError>>;

const DEFAULT_HTTP_PORT: u16 = 2375;
const DEFAULT_TLS_PORT: u16 = 2376;
const TLS_FILES: [&str; 3] = ["key.pem", "cert.pem", "ca.pem"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PullRequest {
    pub image: String,
    pub tag: String,
    /// Registry server address sent along with the pull, if any
    pub server_address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequest {
    /// Image reference in `name:tag` form
    pub image: String,
    /// `NAME=value` entries in caller order; `None` when no variables were supplied
    pub env: Option<Vec<String>>,
    /// Publish every exposed port to a host-assigned port
    pub publish_all_ports: bool,
}

/// Operations the lifecycle manager issues against a container engine.
///
/// Each method maps to exactly one engine request. Errors are returned as the
/// engine reported them.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Engine: Send + Sync {
    /// Start pulling an image; the returned feed carries one JSON progress line per update
    fn pull_image(&self, request: &PullRequest) -> Feed;

    /// Create a container, returning the engine-assigned id
    async fn create_container(&self, request: &CreateRequest) -> Result<String, DockerError>;

    async fn start_container(&self, id: &str) -> Result<(), DockerError>;

    async fn stop_container(&self, id: &str) -> Result<(), DockerError>;

    async fn remove_container(&self, id: &str) -> Result<(), DockerError>;

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse, DockerError>;

    /// Follow stdout and stderr from the start of the retained history
    fn logs(&self, id: &str) -> Feed;
}

/// Live connection to a Docker engine
#[derive(Debug, Clone)]
pub struct BollardEngine {
    docker: Docker,
}

impl BollardEngine {
    /// Build the client from validated settings and verify the engine answers.
    pub async fn connect(config: &ValidatedConfig) -> Result<Self, ConnectionError> {
        info!(
            "Initializing engine client with version '{}', uri '{}', server address '{}', cert path '{}'",
            config.api_version(),
            config.endpoint_uri(),
            config.server_address(),
            config.cert_path()
        );

        let docker = Self::build_client(config)?;
        docker.ping().await?;

        info!("Done initializing engine client");
        Ok(Self { docker })
    }

    /// Wrap an already connected client
    pub const fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }

    fn build_client(config: &ValidatedConfig) -> Result<Docker, ConnectionError> {
        let version = parse_api_version(config.api_version())?;
        let uri = config.endpoint_uri();
        let timeout = config.request_timeout_secs();
        let endpoint = Url::parse(uri).map_err(|e| invalid_endpoint(uri, e.to_string()))?;
        let certs = tls_material(config.cert_path());

        match (endpoint.scheme(), certs) {
            ("tcp" | "http", None) => {
                let addr = tcp_address(&endpoint, DEFAULT_HTTP_PORT)?;
                if !config.cert_path().is_empty() {
                    debug!(
                        "No TLS material under '{}', using plain HTTP",
                        config.cert_path()
                    );
                }
                debug!("Connecting to engine over HTTP at {}", addr);
                Ok(Docker::connect_with_http(&addr, timeout, &version)?)
            }
            ("tcp" | "http" | "https", Some(certs)) => {
                let addr = tcp_address(&endpoint, DEFAULT_TLS_PORT)?;
                debug!(
                    "Connecting to engine over TLS at {} with certificates from {}",
                    addr,
                    certs.display()
                );
                Ok(Docker::connect_with_ssl(
                    &addr,
                    &certs.join("key.pem"),
                    &certs.join("cert.pem"),
                    &certs.join("ca.pem"),
                    timeout,
                    &version,
                )?)
            }
            ("https", None) => Err(invalid_endpoint(
                uri,
                "https requires key.pem, cert.pem and ca.pem under the certificate path",
            )),
            #[cfg(unix)]
            ("unix", _) => {
                debug!("Connecting to engine socket {}", endpoint.path());
                Ok(Docker::connect_with_unix(uri, timeout, &version)?)
            }
            (scheme, _) => Err(invalid_endpoint(
                uri,
                format!("unsupported scheme '{}'", scheme),
            )),
        }
    }
}

#[async_trait]
impl Engine for BollardEngine {
    fn pull_image(&self, request: &PullRequest) -> Feed {
        let options = CreateImageOptions {
            from_image: request.image.clone(),
            tag: request.tag.clone(),
            ..Default::default()
        };
        let credentials = request.server_address.clone().map(|serveraddress| DockerCredentials {
            serveraddress: Some(serveraddress),
            ..Default::default()
        });

        self.docker
            .create_image(Some(options), None, credentials)
            .map(|update| update.map(|info| progress_line(&info)))
            .boxed()
    }

    async fn create_container(&self, request: &CreateRequest) -> Result<String, DockerError> {
        let container_config = Config {
            image: Some(request.image.clone()),
            env: request.env.clone(),
            host_config: Some(HostConfig {
                publish_all_ports: Some(request.publish_all_ports),
                ..Default::default()
            }),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, container_config)
            .await?;

        for warning in &response.warnings {
            debug!("Engine warning while creating container: {}", warning);
        }
        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), DockerError> {
        self.docker.start_container(id, None::<StartContainerOptions<String>>).await
    }

    async fn stop_container(&self, id: &str) -> Result<(), DockerError> {
        self.docker.stop_container(id, None::<StopContainerOptions>).await
    }

    async fn remove_container(&self, id: &str) -> Result<(), DockerError> {
        self.docker.remove_container(id, None::<RemoveContainerOptions>).await
    }

    async fn inspect_container(&self, id: &str) -> Result<ContainerInspectResponse, DockerError> {
        self.docker.inspect_container(id, None).await
    }

    fn logs(&self, id: &str) -> Feed {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            follow: true,
            tail: "all".to_string(),
            ..Default::default()
        };

        self.docker
            .logs(id, Some(options))
            .map(|chunk| chunk.map(log_bytes))
            .boxed()
    }
}

/// Parse "MAJOR.MINOR" (optionally prefixed with 'v') into a client version
pub fn parse_api_version(raw: &str) -> Result<ClientVersion, ConnectionError> {
    let invalid = || ConnectionError::InvalidApiVersion(raw.to_string());
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    let (major, minor) = trimmed.split_once('.').ok_or_else(invalid)?;

    Ok(ClientVersion {
        major_version: major.parse().map_err(|_| invalid())?,
        minor_version: minor.parse().map_err(|_| invalid())?,
    })
}

/// The certificate directory, if it holds all of `key.pem`, `cert.pem` and `ca.pem`
fn tls_material(cert_path: &str) -> Option<PathBuf> {
    if cert_path.is_empty() {
        return None;
    }
    let dir = Path::new(cert_path);
    TLS_FILES
        .iter()
        .all(|name| dir.join(name).exists())
        .then(|| dir.to_path_buf())
}

fn tcp_address(endpoint: &Url, default_port: u16) -> Result<String, ConnectionError> {
    let host = endpoint
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid_endpoint(endpoint.as_str(), "missing host"))?;
    let port = endpoint.port().unwrap_or(default_port);
    Ok(format!("tcp://{}:{}", host, port))
}

fn invalid_endpoint(uri: &str, reason: impl Into<String>) -> ConnectionError {
    ConnectionError::InvalidEndpoint {
        uri: uri.to_string(),
        reason: reason.into(),
    }
}

fn progress_line(info: &CreateImageInfo) -> Vec<u8> {
    let mut line = serde_json::to_vec(info)
        .unwrap_or_else(|_| info.status.clone().unwrap_or_default().into_bytes());
    line.push(b'\n');
    line
}

fn log_bytes(output: LogOutput) -> Vec<u8> {
    match output {
        LogOutput::StdOut { message }
        | LogOutput::StdErr { message }
        | LogOutput::Console { message }
        | LogOutput::StdIn { message } => message.to_vec(),
    }
}
