//! Tracing setup.
//!
//! The TUI owns the terminal, so in that mode logs go to a file.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub(crate) enum LogTarget {
    Stderr,
    File(PathBuf),
}

/// `<cache dir>/restore-cli/restore-cli.log`, falling back to the temp dir.
pub(crate) fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("restore-cli")
        .join("restore-cli.log")
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
}

fn open_log_file(path: &Path) -> Result<std::fs::File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

/// Install the global subscriber. Calling it twice is harmless.
pub(crate) fn init(target: LogTarget, default_level: &str) -> Result<()> {
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter(default_level));
    let res = match target {
        LogTarget::Stderr => builder.with_writer(std::io::stderr).try_init(),
        LogTarget::File(path) => {
            let file = open_log_file(&path)?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
    };
    if let Err(e) = res {
        tracing::debug!("tracing already initialised: {e}");
    }
    Ok(())
}
