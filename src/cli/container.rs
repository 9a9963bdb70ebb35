// ABOUTME: CLI lifecycle commands - pull, create, start, stop, rm, inspect, host, keys
//
// Each command connects once, issues one lifecycle operation and prints its result.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;

use super::util::{connect, load_config};
use super::{ContainerArgs, CreateArgs, ImageArgs, OutputFormat};
use crate::config::required_keys;
use crate::docker::{endpoint_host, is_running, ContainerHandle, ContainerInspection};

/// JSON output structure for create
#[derive(Debug, Serialize)]
pub struct CreatedOutput {
    pub id: String,
    pub image: String,
}

/// Pull an image and wait until the engine closes the progress feed
pub async fn pull(args: ImageArgs, config: Option<&Path>) -> Result<()> {
    let manager = connect(config).await?;
    manager
        .pull_image(&args.image, &args.tag)
        .await
        .with_context(|| format!("Failed to pull {}:{}", args.image, args.tag))?;
    println!("Pulled {}:{}", args.image, args.tag);
    Ok(())
}

/// Pull and create; prints the new container id
pub async fn create(args: CreateArgs, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let manager = connect(config).await?;
    let ImageArgs { image, tag } = args.image;
    let handle = manager
        .create_container(&image, &tag, &args.env)
        .await
        .with_context(|| format!("Failed to create container from {image}:{tag}"))?;

    match format {
        OutputFormat::Text => println!("{handle}"),
        OutputFormat::Json => {
            let output = CreatedOutput {
                id: handle.into_inner(),
                image: format!("{image}:{tag}"),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

pub async fn start(args: ContainerArgs, config: Option<&Path>) -> Result<()> {
    let manager = connect(config).await?;
    let handle = ContainerHandle::new(args.container);
    manager
        .start_container(&handle)
        .await
        .with_context(|| format!("Failed to start container {handle}"))?;
    println!("Started {handle}");
    Ok(())
}

pub async fn stop(args: ContainerArgs, config: Option<&Path>) -> Result<()> {
    let manager = connect(config).await?;
    let handle = ContainerHandle::new(args.container);
    manager
        .stop_container(&handle)
        .await
        .with_context(|| format!("Failed to stop container {handle}"))?;
    println!("Stopped {handle}");
    Ok(())
}

pub async fn remove(args: ContainerArgs, config: Option<&Path>) -> Result<()> {
    let manager = connect(config).await?;
    let handle = ContainerHandle::new(args.container);
    manager
        .delete_container(&handle)
        .await
        .with_context(|| format!("Failed to remove container {handle}"))?;
    println!("Removed {handle}");
    Ok(())
}

pub async fn inspect(args: ContainerArgs, config: Option<&Path>, format: OutputFormat) -> Result<()> {
    let manager = connect(config).await?;
    let handle = ContainerHandle::new(args.container);
    let inspection = manager
        .inspect_container(&handle)
        .await
        .with_context(|| format!("Failed to inspect container {handle}"))?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&inspection)?),
        OutputFormat::Text => print!("{}", summarize(&inspection)),
    }
    Ok(())
}

/// Print the endpoint host without contacting the engine
pub fn host(config: Option<&Path>) -> Result<()> {
    let config = load_config(config)?;
    println!("{}", endpoint_host(config.endpoint_uri())?);
    Ok(())
}

pub fn keys(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            for key in required_keys() {
                println!("{key}");
            }
        }
        OutputFormat::Json => println!("{}", serde_json::to_string(required_keys())?),
    }
    Ok(())
}

/// Short human-readable view of an inspection
fn summarize(inspection: &ContainerInspection) -> String {
    let mut lines = vec![
        format!("ID:      {}", inspection.id.as_deref().unwrap_or("-")),
        format!("Name:    {}", inspection.name.as_deref().unwrap_or("-")),
        format!(
            "Image:   {}",
            inspection.config.as_ref().and_then(|c| c.image.as_deref()).unwrap_or("-")
        ),
        format!(
            "Status:  {}",
            inspection
                .state
                .as_ref()
                .and_then(|s| s.status.as_ref())
                .map_or_else(|| "-".to_string(), ToString::to_string)
        ),
        format!("Running: {}", is_running(inspection)),
    ];

    let ports = inspection.network_settings.as_ref().and_then(|n| n.ports.as_ref());
    if let Some(ports) = ports {
        let mut published: Vec<String> = ports
            .iter()
            .flat_map(|(container_port, bindings)| {
                bindings.iter().flatten().filter_map(move |binding| {
                    binding
                        .host_port
                        .as_ref()
                        .map(|host_port| format!("{container_port} -> {host_port}"))
                })
            })
            .collect();
        published.sort();
        if !published.is_empty() {
            lines.push(format!("Ports:   {}", published.join(", ")));
        }
    }

    lines.join("\n") + "\n"
}
