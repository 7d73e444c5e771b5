//! Filesystem locations for icons, service state, logs and configuration.

use std::path::{Path, PathBuf};

use crate::error::{StateError, StateResult};
use crate::protocol_constants::APP_NAME;

const ARGS_FILE: &str = "service-args.json";
const PID_FILE: &str = "service.pid";
const LOG_FILE: &str = "cast_control.log";
const CONFIG_FILE: &str = "config.yaml";
const APPLICATIONS_DIR: &str = "applications";

/// Per-user directories the daemon reads and writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub data_dir: PathBuf,
    pub state_dir: PathBuf,
    pub config_dir: PathBuf,
    /// Where desktop shells look up `.desktop` entries.
    pub applications_dir: PathBuf,
}

impl AppPaths {
    /// Resolves the platform directories, each with an `cast_control`
    /// subdirectory. The state dir falls back to the local data dir on
    /// platforms without one.
    pub fn from_env() -> StateResult<Self> {
        let data = dirs::data_dir().ok_or(StateError::NoHomeDir)?;
        let state = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or(StateError::NoHomeDir)?;
        let config = dirs::config_dir().ok_or(StateError::NoHomeDir)?;

        Ok(Self {
            data_dir: data.join(APP_NAME),
            state_dir: state.join(APP_NAME),
            config_dir: config.join(APP_NAME),
            applications_dir: data.join(APPLICATIONS_DIR),
        })
    }

    /// Places every directory under `root`.
    pub fn at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_dir: root.join("data"),
            state_dir: root.join("state"),
            config_dir: root.join("config"),
            applications_dir: root.join(APPLICATIONS_DIR),
        }
    }

    pub fn icon_dir(&self) -> PathBuf {
        self.data_dir.join("icons")
    }

    pub fn desktop_file(&self) -> PathBuf {
        self.applications_dir.join(format!("{}.desktop", APP_NAME))
    }

    pub fn args_file(&self) -> PathBuf {
        self.state_dir.join(ARGS_FILE)
    }

    pub fn pid_file(&self) -> PathBuf {
        self.state_dir.join(PID_FILE)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir.join("log")
    }

    pub fn log_file(&self) -> PathBuf {
        self.log_dir().join(LOG_FILE)
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }
}

/// Creates `dir` and its parents.
pub(crate) fn ensure_dir(dir: &Path) -> StateResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| StateError::io(dir, e))
}
