//! File-backed diagnostics.
//!
//! Standard output carries the child's bytes and standard error carries our
//! own messages, so tracing output only ever goes to a file.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Install the global subscriber if a log file is configured. Without one,
/// tracing events are discarded.
pub fn init(config: &Config) -> Result<()> {
    let Some(path) = config.log_file.as_ref() else {
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
    }

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_thread_names(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_without_log_file() {
        let config = Config::default();
        init(&config).unwrap();
    }

    #[test]
    fn unusable_log_path_is_reported() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = Config {
            log_file: Some(file.path().join("pty-helper.log")),
            ..Config::default()
        };
        let err = init(&config).unwrap_err();
        assert!(err.to_string().contains("log directory"), "{err:#}");
    }
}
