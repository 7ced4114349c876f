//! Tracing setup.
//!
//! The TUI owns stdout/stderr, so interactive runs write logs to a file.
//! One-shot commands log to stderr.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

pub enum LogTarget<'a> {
    File(&'a Path),
    Stderr,
}

fn filter(verbose: bool) -> EnvFilter {
    let default = if verbose { "consult_chat=debug" } else { "consult_chat=info" };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

pub fn init(target: LogTarget<'_>, verbose: bool) -> Result<()> {
    match target {
        LogTarget::File(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating log directory {}", parent.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;

            tracing_subscriber::fmt()
                .with_env_filter(filter(verbose))
                .with_ansi(false)
                .with_target(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .map_err(|e| anyhow::anyhow!("installing logger: {}", e))?;
        }
        LogTarget::Stderr => {
            tracing_subscriber::fmt()
                .with_env_filter(filter(verbose))
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!("installing logger: {}", e))?;
        }
    }
    Ok(())
}
