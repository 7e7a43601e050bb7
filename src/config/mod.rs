//! Configuration management for pty-helper.
//!
//! Settings come from an optional JSON file and a few environment overrides.
//! Nothing here is required: every field has a default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable pointing at an alternative config file
pub const CONFIG_ENV: &str = "PTY_HELPER_CONFIG";
/// Environment variable naming a log file
pub const LOG_ENV: &str = "PTY_HELPER_LOG";
/// Environment variable holding a tracing filter directive
pub const LOG_LEVEL_ENV: &str = "PTY_HELPER_LOG_LEVEL";
/// Environment variable overriding `TERM` for the child
pub const TERM_ENV: &str = "PTY_HELPER_TERM";

/// `TERM` exported to the child when neither config nor parent provide one
pub const DEFAULT_TERM: &str = "xterm-256color";

const MIN_BUFFER_SIZE: usize = 512;
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Main configuration struct
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `TERM` value for the child; `None` inherits the parent's
    pub term: Option<String>,
    /// Rows used when the controlling terminal size is unreadable
    pub fallback_rows: u16,
    /// Columns used when the controlling terminal size is unreadable
    pub fallback_cols: u16,
    /// Relay copy buffer size in bytes
    pub buffer_size: usize,
    /// How long to wait for remaining child output after it exits
    pub drain_timeout_ms: u64,
    /// Log file; logging is disabled when unset
    pub log_file: Option<PathBuf>,
    /// Tracing filter directive
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            term: None,
            fallback_rows: 30,
            fallback_cols: 80,
            buffer_size: 4096,
            drain_timeout_ms: 250,
            log_file: None,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from disk and apply environment overrides.
    ///
    /// A missing file is not an error and yields the defaults.
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) => Self::load_from(&path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate();
        Ok(config)
    }

    /// Load configuration from a specific file, or return default if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate();

        Ok(config)
    }

    /// Apply environment overrides through the given lookup.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(LOG_ENV).filter(|v| !v.is_empty()) {
            self.log_file = Some(PathBuf::from(path));
        }
        if let Some(level) = lookup(LOG_LEVEL_ENV).filter(|v| !v.is_empty()) {
            self.log_level = level;
        }
        if let Some(term) = lookup(TERM_ENV).filter(|v| !v.is_empty()) {
            self.term = Some(term);
        }
    }

    /// Clamp values to usable ranges
    pub fn validate(&mut self) {
        self.buffer_size = self.buffer_size.clamp(MIN_BUFFER_SIZE, MAX_BUFFER_SIZE);
        if self.fallback_rows == 0 {
            self.fallback_rows = Self::default().fallback_rows;
        }
        if self.fallback_cols == 0 {
            self.fallback_cols = Self::default().fallback_cols;
        }
    }

    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// `TERM` to export to the child, if it needs one set explicitly.
    ///
    /// `parent_term` is the helper's own `TERM`; when present and not
    /// overridden, the child simply inherits it.
    pub fn child_term(&self, parent_term: Option<&str>) -> Option<String> {
        match (&self.term, parent_term) {
            (Some(term), _) => Some(term.clone()),
            (None, Some(parent)) if !parent.is_empty() => None,
            (None, _) => Some(DEFAULT_TERM.to_string()),
        }
    }

    /// Get the path to the config file
    fn config_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("pty-helper").join("config.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.fallback_rows, 30);
        assert_eq!(config.fallback_cols, 80);
        assert_eq!(config.buffer_size, 4096);
        assert_eq!(config.drain_timeout(), Duration::from_millis(250));
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&temp_dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, r#"{ "term": "xterm-color", "buffer_size": 10 }"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.term.as_deref(), Some("xterm-color"));
        // Clamped to the minimum
        assert_eq!(config.buffer_size, MIN_BUFFER_SIZE);
        assert_eq!(config.fallback_cols, 80);
    }

    #[test]
    fn test_malformed_file_is_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            LOG_ENV => Some("/tmp/pty-helper.log".to_string()),
            LOG_LEVEL_ENV => Some("debug".to_string()),
            TERM_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.log_file, Some(PathBuf::from("/tmp/pty-helper.log")));
        assert_eq!(config.log_level, "debug");
        // Empty values are ignored
        assert!(config.term.is_none());
    }

    #[test]
    fn test_child_term_resolution() {
        let mut config = Config::default();
        assert_eq!(config.child_term(Some("screen")), None);
        assert_eq!(config.child_term(None).as_deref(), Some(DEFAULT_TERM));
        assert_eq!(config.child_term(Some("")).as_deref(), Some(DEFAULT_TERM));

        config.term = Some("vt100".to_string());
        assert_eq!(config.child_term(Some("screen")).as_deref(), Some("vt100"));
    }

    #[test]
    fn test_zero_fallback_size_is_replaced() {
        let mut config = Config {
            fallback_rows: 0,
            fallback_cols: 0,
            ..Default::default()
        };
        config.validate();
        assert_eq!((config.fallback_rows, config.fallback_cols), (30, 80));
    }
}
