//! Configuration loading and config file resolution
//!
//! Every field has a compiled default, so a missing config file is not an
//! error: SongQ starts with defaults and [`ConfigSource`] tells the caller
//! which case applied, to be logged once tracing is up.
//!
//! Config file resolution order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. User config dir (`<config_dir>/songq/config.toml`)
//! 4. System config (`/etc/songq/config.toml`, Linux only)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::fmt;
use std::time::Duration;

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "SONGQ_CONFIG";

/// Endpoint the song request server listens on
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:9999";

/// Where a loaded configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Parsed from this file
    File(PathBuf),
    /// This file was requested but does not exist; defaults in use
    Missing(PathBuf),
    /// No config file in any default location; defaults in use
    Defaults,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Missing(path) => {
                write!(f, "{} not found, using defaults", path.display())
            }
            ConfigSource::Defaults => write!(f, "no config file found, using defaults"),
        }
    }
}

/// Top-level TOML configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// WebSocket endpoint delivering `PLAY`/`SKIP` commands
    pub endpoint: String,
    pub poll: PollConfig,
    pub widget: WidgetConfig,
    pub logging: LoggingConfig,
    pub status: StatusConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            poll: PollConfig::default(),
            widget: WidgetConfig::default(),
            logging: LoggingConfig::default(),
            status: StatusConfig::default(),
        }
    }
}

/// Poll loop timer periods
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Connection health check period
    pub health_interval_ms: u64,
    /// Idle-playback check period
    pub playback_interval_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            health_interval_ms: 3000,
            playback_interval_ms: 1000,
        }
    }
}

impl PollConfig {
    pub fn health_interval(&self) -> Duration {
        Duration::from_millis(self.health_interval_ms)
    }

    pub fn playback_interval(&self) -> Duration {
        Duration::from_millis(self.playback_interval_ms)
    }
}

/// Which widget provider renders playback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WidgetBackend {
    /// External player process (mpv by default)
    Process,
    /// No output; each item "ends" after `dry_run_ms`
    DryRun,
}

/// Video widget settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    pub backend: WidgetBackend,
    /// Anchor id the widget binds to
    pub anchor: String,
    pub width: u32,
    pub height: u32,
    /// Player executable for the process backend
    pub command: String,
    /// Argument templates; `{id}`, `{url}`, `{width}`, `{height}` and
    /// `{anchor}` are substituted per item
    pub args: Vec<String>,
    /// Template for `{url}`
    pub url_template: String,
    /// Simulated item length for the dry-run backend
    pub dry_run_ms: u64,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            backend: WidgetBackend::Process,
            anchor: "yt".to_string(),
            width: 640,
            height: 390,
            command: "mpv".to_string(),
            args: vec![
                "--force-window=yes".to_string(),
                "--geometry={width}x{height}".to_string(),
                "--title={anchor}".to_string(),
                "{url}".to_string(),
            ],
            url_template: "https://www.youtube.com/watch?v={id}".to_string(),
            dry_run_ms: 3000,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is unset
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Read-only status API settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    pub enabled: bool,
    pub bind: String,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "127.0.0.1:5790".to_string(),
        }
    }
}

impl TomlConfig {
    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load a config file if one exists, otherwise fall back to defaults
    ///
    /// A missing file yields defaults with [`ConfigSource::Missing`]. A file
    /// that exists but cannot be parsed or fails validation is an error.
    pub fn load_or_default(path: Option<&Path>) -> Result<(Self, ConfigSource)> {
        match path {
            Some(path) if path.exists() => {
                Ok((Self::load(path)?, ConfigSource::File(path.to_path_buf())))
            }
            Some(path) => Ok((Self::default(), ConfigSource::Missing(path.to_path_buf()))),
            None => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    /// Reject settings the player cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_string()));
        }
        if self.poll.health_interval_ms == 0 {
            return Err(Error::Config(
                "poll.health_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.poll.playback_interval_ms == 0 {
            return Err(Error::Config(
                "poll.playback_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.widget.backend == WidgetBackend::Process && self.widget.command.trim().is_empty() {
            return Err(Error::Config(
                "widget.command must not be empty for the process backend".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve which config file to load
///
/// Returns the first candidate in priority order. CLI and environment
/// candidates are returned even if the file does not exist, so the caller
/// can warn about it; default locations are only returned when present.
pub fn resolve_config_path(cli_arg: Option<&Path>, env_var_name: &str) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(env_var_name) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_paths().into_iter().find(|path| path.exists())
}

/// Platform default config locations, most specific first
fn default_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("songq").join("config.toml"));
    }

    if cfg!(target_os = "linux") {
        paths.push(PathBuf::from("/etc/songq/config.toml"));
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_player() {
        let config = TomlConfig::default();
        assert_eq!(config.endpoint, "ws://localhost:9999");
        assert_eq!(config.poll.health_interval(), Duration::from_secs(3));
        assert_eq!(config.poll.playback_interval(), Duration::from_secs(1));
        assert_eq!(config.widget.anchor, "yt");
        assert_eq!((config.widget.width, config.widget.height), (640, 390));
        assert!(!config.status.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TomlConfig::from_toml_str(
            r#"
            endpoint = "ws://10.0.0.5:9999"

            [widget]
            backend = "dry-run"
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoint, "ws://10.0.0.5:9999");
        assert_eq!(config.widget.backend, WidgetBackend::DryRun);
        assert_eq!(config.widget.command, "mpv");
        assert_eq!(config.poll, PollConfig::default());
    }

    #[test]
    fn test_zero_interval_rejected() {
        let result = TomlConfig::from_toml_str("[poll]\nplayback_interval_ms = 0\n");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_empty_command_rejected_only_for_process_backend() {
        let mut config = TomlConfig::default();
        config.widget.command = String::new();
        assert!(config.validate().is_err());

        config.widget.backend = WidgetBackend::DryRun;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let result = TomlConfig::from_toml_str("endpoint = [");
        assert!(matches!(result, Err(Error::Toml(_))));
    }
}
