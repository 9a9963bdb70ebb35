// ABOUTME: CLI argument parsing and command routing for berth
//
// Provides command-line access to the container lifecycle:
// - Pulling images (pull)
// - Creating, starting, stopping and removing containers (create, start, stop, rm)
// - Inspecting containers and following their logs (inspect, logs)
// - Showing the engine host and the required setting keys (host, keys)

pub mod container;
pub mod logs;
pub mod util;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Pull, run and tear down auxiliary service containers on a Docker engine
#[derive(Parser)]
#[command(name = "berth")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Engine settings file (TOML with an [engine] table)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Also write human-readable logs to stderr
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

/// Output format for commands
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Pull an image and wait for the engine to finish
    Pull(ImageArgs),

    /// Pull an image and create a container from it
    Create(CreateArgs),

    /// Start a container, publishing all exposed ports
    Start(ContainerArgs),

    /// Stop a container
    Stop(ContainerArgs),

    /// Remove a container
    Rm(ContainerArgs),

    /// Show the engine's inspection of a container
    Inspect(ContainerArgs),

    /// Follow a container's stdout and stderr (like tail -f, from the beginning)
    Logs(ContainerArgs),

    /// Print the host of the configured engine endpoint
    Host,

    /// Print the setting keys required to connect to the engine
    Keys,
}

/// Arguments naming an image
#[derive(clap::Args)]
pub struct ImageArgs {
    /// Image name (e.g., mysql)
    pub image: String,

    /// Image tag
    #[arg(long, short, default_value = "latest")]
    pub tag: String,
}

/// Arguments for the create command
#[derive(clap::Args)]
pub struct CreateArgs {
    #[command(flatten)]
    pub image: ImageArgs,

    /// Environment variable as NAME=VALUE (repeatable, order is kept)
    #[arg(long, short, value_parser = util::parse_env_pair)]
    pub env: Vec<(String, String)>,
}

/// Arguments naming a container
#[derive(clap::Args)]
pub struct ContainerArgs {
    /// Container ID as returned by create
    pub container: String,
}
