// ABOUTME: Docker engine integration for running auxiliary service containers

pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod log_stream;

pub use engine::{BollardEngine, CreateRequest, Engine, Feed, PullRequest};
pub use error::{ConnectionError, DockerError, LifecycleError};
pub use lifecycle::{
    ContainerHandle, ContainerInspection, ContainerLifecycleManager, endpoint_host,
    environment_entries, is_running,
};
pub use log_stream::LogStream;
