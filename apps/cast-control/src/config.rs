//! Connect options: YAML file defaults merged under CLI flags.
//!
//! Precedence, highest first: command-line flag, `CAST_CONTROL_*`
//! environment variable (both handled by clap), config file, built-in
//! default.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cast_control_core::protocol_constants::DEFAULT_RETRY_WAIT_SECS;
use cast_control_core::DaemonArgs;
use clap::Args;
use serde::Deserialize;

/// Default log level when nothing else sets one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Options shared by `connect` and `service connect`.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectArgs {
    /// Friendly name of the cast device.
    #[arg(short = 'n', long, env = "CAST_CONTROL_NAME")]
    pub name: Option<String>,

    /// Hostname or IP address of the cast device.
    #[arg(short = 'h', long, env = "CAST_CONTROL_HOST")]
    pub host: Option<String>,

    /// UUID of the cast device.
    #[arg(short = 'u', long, env = "CAST_CONTROL_UUID")]
    pub uuid: Option<String>,

    /// Seconds to wait between attempts to find the device. Without it a
    /// missing device is fatal.
    #[arg(short = 'w', long, env = "CAST_CONTROL_WAIT")]
    pub wait: Option<f64>,

    /// Seconds to wait before reconnecting after the connection drops [default: 5].
    #[arg(short = 'r', long, env = "CAST_CONTROL_RETRY_WAIT")]
    pub retry_wait: Option<f64>,

    /// Use the light icon, which suits dark themes.
    #[arg(short = 'i', long, env = "CAST_CONTROL_ICON")]
    pub icon: bool,

    /// Log level (error, warn, info, debug, trace) [default: warn].
    #[arg(short = 'l', long, env = "CAST_CONTROL_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Configuration file (YAML) supplying defaults for these options.
    #[arg(long, value_name = "FILE", env = "CAST_CONTROL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print help.
    #[arg(long, action = clap::ArgAction::Help)]
    pub help: Option<bool>,
}

impl ConnectArgs {
    /// Merges these options over `file`.
    pub fn resolve(&self, file: FileConfig) -> DaemonArgs {
        DaemonArgs {
            name: self.name.clone().or(file.name),
            host: self.host.clone().or(file.host),
            uuid: self.uuid.clone().or(file.uuid),
            wait: self.wait.or(file.wait),
            retry_wait: self
                .retry_wait
                .or(file.retry_wait)
                .unwrap_or(DEFAULT_RETRY_WAIT_SECS),
            icon: self.icon || file.icon.unwrap_or(false),
            log_level: self
                .log_level
                .clone()
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        }
    }
}

/// Defaults read from the configuration file.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(default, rename_all = "kebab-case")]
pub struct FileConfig {
    pub name: Option<String>,
    pub host: Option<String>,
    pub uuid: Option<String>,
    pub wait: Option<f64>,
    pub retry_wait: Option<f64>,
    pub icon: Option<bool>,
    pub log_level: Option<String>,
}

impl FileConfig {
    /// Loads `explicit` if given, otherwise `default_path` when it exists.
    ///
    /// A missing default file yields empty defaults; a missing explicit
    /// file is an error.
    pub fn load(explicit: Option<&Path>, default_path: &Path) -> Result<Self> {
        let path = match explicit {
            Some(path) => path,
            None if default_path.exists() => default_path,
            None => return Ok(Self::default()),
        };

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_values_win_over_file_values() {
        let cli = ConnectArgs {
            name: Some("Kitchen".into()),
            retry_wait: Some(1.0),
            ..ConnectArgs::default()
        };
        let file = FileConfig {
            name: Some("Office".into()),
            host: Some("10.0.0.5".into()),
            retry_wait: Some(30.0),
            log_level: Some("debug".into()),
            ..FileConfig::default()
        };

        let args = cli.resolve(file);

        assert_eq!(args.name.as_deref(), Some("Kitchen"));
        assert_eq!(args.host.as_deref(), Some("10.0.0.5"));
        assert_eq!(args.retry_wait, 1.0);
        assert_eq!(args.log_level, "debug");
    }

    #[test]
    fn built_in_defaults_apply_last() {
        let args = ConnectArgs::default().resolve(FileConfig::default());

        assert_eq!(args.wait, None);
        assert_eq!(args.retry_wait, DEFAULT_RETRY_WAIT_SECS);
        assert_eq!(args.log_level, DEFAULT_LOG_LEVEL);
        assert!(!args.icon);
    }

    #[test]
    fn icon_can_be_enabled_from_file() {
        let file = FileConfig {
            icon: Some(true),
            ..FileConfig::default()
        };
        assert!(ConnectArgs::default().resolve(file).icon);
    }

    #[test]
    fn yaml_file_is_parsed_with_kebab_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "name: Living Room\nwait: 2.5\nretry-wait: 10\nicon: true\n").unwrap();

        let config = FileConfig::load(Some(&path), &dir.path().join("unused.yaml")).unwrap();

        assert_eq!(config.name.as_deref(), Some("Living Room"));
        assert_eq!(config.wait, Some(2.5));
        assert_eq!(config.retry_wait, Some(10.0));
        assert_eq!(config.icon, Some(true));
    }

    #[test]
    fn missing_default_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileConfig::load(None, &dir.path().join("config.yaml")).unwrap();
        assert_eq!(config, FileConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.yaml");
        assert!(FileConfig::load(Some(&missing), &missing).is_err());
    }
}
