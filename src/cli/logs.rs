// ABOUTME: CLI logs command - follow a container's combined stdout/stderr
//
// Prints every line from the start of the container's history and keeps following
// until the engine closes the feed or the user presses Ctrl-C.

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::debug;

use super::util::connect;
use super::ContainerArgs;
use crate::docker::{ContainerHandle, LogStream};

/// Execute the logs command
pub async fn execute(args: ContainerArgs, config: Option<&Path>) -> Result<()> {
    let manager = connect(config).await?;
    let handle = ContainerHandle::new(args.container);
    let logs = manager.log_container(&handle);

    let mut stdout = std::io::stdout().lock();
    tokio::select! {
        result = follow(logs, &mut stdout) => {
            let count = result.with_context(|| format!("Failed to read logs of {handle}"))?;
            debug!("Log feed of {} closed after {} lines", handle, count);
            Ok(())
        }
        _ = tokio::signal::ctrl_c() => {
            debug!("Interrupted while following logs of {}", handle);
            Ok(())
        }
    }
}

/// Copy lines to `out` until the feed closes
pub async fn follow<W: Write>(mut logs: LogStream, out: &mut W) -> Result<usize> {
    let mut count = 0;
    while let Some(line) = logs.next_line().await {
        writeln!(out, "{}", line?)?;
        out.flush()?;
        count += 1;
    }
    logs.close();
    Ok(count)
}
