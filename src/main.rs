// ABOUTME: Main entry point for berth
//
// Binary: berth
// Usage: berth [--config PATH] [--verbose] <COMMAND>
// - pull: pull an image
// - create: pull an image and create a container
// - start / stop / rm: drive a container through its lifecycle
// - inspect: show container state
// - logs: follow container output
// - host: print the engine endpoint host
// - keys: list required settings

#![allow(missing_docs)]

use anyhow::Result;
use clap::Parser;
use std::fs::OpenOptions;
use std::path::PathBuf;

use berth::cli::{self, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();
    setup_logging(args.verbose);
    setup_panic_handler();

    let config = args.config.as_deref();
    let result = match args.command {
        Commands::Pull(image_args) => cli::container::pull(image_args, config).await,
        Commands::Create(create_args) => {
            cli::container::create(create_args, config, args.format).await
        }
        Commands::Start(container_args) => cli::container::start(container_args, config).await,
        Commands::Stop(container_args) => cli::container::stop(container_args, config).await,
        Commands::Rm(container_args) => cli::container::remove(container_args, config).await,
        Commands::Inspect(container_args) => {
            cli::container::inspect(container_args, config, args.format).await
        }
        Commands::Logs(container_args) => cli::logs::execute(container_args, config).await,
        Commands::Host => cli::container::host(config),
        Commands::Keys => cli::container::keys(args.format),
    };

    if let Err(e) = &result {
        tracing::error!("Command failed: {:#}", e);
    }
    result
}

fn setup_logging(verbose: bool) {
    use tracing_subscriber::prelude::*;

    // Create log directory if it doesn't exist
    let log_dir = dirs::home_dir()
        .map(|home| home.join(".berth").join("logs"))
        .unwrap_or_else(|| PathBuf::from(".berth/logs"));

    let _ = std::fs::create_dir_all(&log_dir);

    // Create JSONL log file with timestamp
    let log_file = log_dir.join(format!(
        "berth-{}.jsonl",
        chrono::Local::now().format("%Y%m%d-%H%M%S")
    ));

    // A missing log file should not stop the command from running
    let file_layer = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .ok()
        .map(|file| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_target(true)
                .with_writer(file)
                .with_ansi(false)
        });

    let stderr_layer = verbose.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "berth=info".into()),
        )
        .init();
}

fn setup_panic_handler() {
    use tracing::error;

    std::panic::set_hook(Box::new(|panic_info| {
        error!("Application panicked: {}", panic_info);
        eprintln!("Application panicked: {}", panic_info);
        eprintln!("Please check the logs in ~/.berth/logs for more details.");
    }));
}
