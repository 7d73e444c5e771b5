//! Arguments persisted by `service connect` for `service reconnect`.

use std::io::ErrorKind;

use serde::{Deserialize, Serialize};

use crate::device::DeviceIdentity;
use crate::error::{StateError, StateResult};
use crate::paths::{ensure_dir, AppPaths};
use crate::protocol_constants::DEFAULT_RETRY_WAIT_SECS;
use crate::supervisor::RetryPolicy;

fn default_retry_wait() -> f64 {
    DEFAULT_RETRY_WAIT_SECS
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Connect options of the background service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonArgs {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub uuid: Option<String>,
    /// Seconds between discovery attempts; `None` gives up after one miss.
    #[serde(default)]
    pub wait: Option<f64>,
    #[serde(default = "default_retry_wait")]
    pub retry_wait: f64,
    /// Use the light default icon.
    #[serde(default)]
    pub icon: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for DaemonArgs {
    fn default() -> Self {
        Self {
            name: None,
            host: None,
            uuid: None,
            wait: None,
            retry_wait: default_retry_wait(),
            icon: false,
            log_level: default_log_level(),
        }
    }
}

impl DaemonArgs {
    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.name.clone(), self.host.clone(), self.uuid.clone())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_secs(self.wait, self.retry_wait)
    }

    /// Reads the saved arguments. Returns `None` when nothing was saved.
    pub fn load(paths: &AppPaths) -> StateResult<Option<Self>> {
        let path = paths.args_file();
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StateError::io(path, e)),
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|source| StateError::Parse { path, source })
    }

    /// Writes the arguments, replacing any previous copy.
    ///
    /// Written to a temp file and renamed so a crash never leaves a torn file.
    pub fn save(&self, paths: &AppPaths) -> StateResult<()> {
        ensure_dir(&paths.state_dir)?;
        let path = paths.args_file();
        let temp_path = path.with_extension("json.tmp");
        let contents = serde_json::to_string_pretty(self).map_err(|source| StateError::Parse {
            path: path.clone(),
            source,
        })?;

        std::fs::write(&temp_path, contents).map_err(|e| StateError::io(&temp_path, e))?;
        std::fs::rename(&temp_path, &path).map_err(|e| StateError::io(&path, e))
    }

    /// Removes the saved arguments. Missing files are not an error.
    pub fn delete(paths: &AppPaths) -> StateResult<()> {
        let path = paths.args_file();
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StateError::io(path, e)),
        }
    }
}
