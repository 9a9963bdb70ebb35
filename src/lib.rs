// ABOUTME: Library crate for berth exposing the container lifecycle API for pipelines and tests

#![allow(missing_docs)]

pub mod cli;
pub mod config;
pub mod docker;

pub use config::{validate, MissingConfigurationError, ValidatedConfig};
pub use docker::{ContainerHandle, ContainerLifecycleManager, LifecycleError, LogStream};
