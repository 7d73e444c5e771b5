//! Bundled default artwork and the desktop entry that references it.
//!
//! Icons are compiled into the binary and written to the data directory once
//! at startup; the resulting [`DefaultIcons`] is shared by `Arc` afterwards.

use std::path::{Path, PathBuf};

use crate::error::{StateError, StateResult};
use crate::paths::{ensure_dir, AppPaths};
use crate::protocol_constants::{APP_DISPLAY_NAME, APP_NAME};

const DARK_ICON: &[u8] = include_bytes!("../assets/icon/cc-black.svg");
const LIGHT_ICON: &[u8] = include_bytes!("../assets/icon/cc-white.svg");
const DARK_ICON_NAME: &str = "cc-black.svg";
const LIGHT_ICON_NAME: &str = "cc-white.svg";

/// Installed default icons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DefaultIcons {
    dark: PathBuf,
    light: PathBuf,
    use_light: bool,
}

impl DefaultIcons {
    /// Writes both icons into the icon directory unless an identical copy is
    /// already there.
    pub fn install(paths: &AppPaths, use_light: bool) -> StateResult<Self> {
        let dir = paths.icon_dir();
        ensure_dir(&dir)?;

        let dark = dir.join(DARK_ICON_NAME);
        let light = dir.join(LIGHT_ICON_NAME);
        write_if_changed(&dark, DARK_ICON)?;
        write_if_changed(&light, LIGHT_ICON)?;

        Ok(Self {
            dark,
            light,
            use_light,
        })
    }

    /// Icon selected by the `--icon` flag.
    pub fn path(&self) -> &Path {
        if self.use_light {
            &self.light
        } else {
            &self.dark
        }
    }

    /// `file://` URL of the selected icon, used as fallback artwork.
    pub fn art_url(&self) -> String {
        format!("file://{}", self.path().display())
    }

    /// Writes the desktop entry pointing at the selected icon and returns the
    /// entry name advertised on the bus.
    pub fn install_desktop_entry(&self, paths: &AppPaths) -> StateResult<String> {
        ensure_dir(&paths.applications_dir)?;
        let entry = format!(
            "[Desktop Entry]\nType=Application\nName={}\nIcon={}\nNoDisplay=true\n",
            APP_DISPLAY_NAME,
            self.path().display()
        );
        write_if_changed(&paths.desktop_file(), entry.as_bytes())?;
        Ok(APP_NAME.to_string())
    }
}

fn write_if_changed(path: &Path, contents: &[u8]) -> StateResult<()> {
    match std::fs::read(path) {
        Ok(existing) if existing == contents => return Ok(()),
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(StateError::io(path, e)),
    }
    log::debug!("[Icons] writing {}", path.display());
    std::fs::write(path, contents).map_err(|e| StateError::io(path, e))
}
