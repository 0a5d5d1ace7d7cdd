//! Persisted user preferences.
//!
//! The whole record is read once at startup and written back wholesale at
//! shutdown as a small JSON object. Missing keys take their default values.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compositor::{Placement, Position};
use crate::error::{Error, Result};

/// Settings file name used when none is given.
pub const DEFAULT_SETTINGS_FILE: &str = "settings.json";

/// Last-used logo, output folder and placement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Path of the PNG logo, empty if none chosen yet.
    pub logo_path: String,
    /// Output directory, empty to write next to each input.
    pub output_dir: String,
    /// Anchor for non-tiled logos.
    pub position: Position,
    /// Logo width as a percentage of the image width.
    pub scale: f64,
    /// Logo opacity percentage.
    pub opacity: f64,
    /// Tile the logo across the image.
    pub repeat_logo: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let placement = Placement::default();
        Self {
            logo_path: String::new(),
            output_dir: String::new(),
            position: placement.position,
            scale: placement.scale_percent,
            opacity: placement.opacity_percent,
            repeat_logo: placement.repeat,
        }
    }
}

impl Settings {
    /// Read settings from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SettingsRead`] if the file cannot be read and
    /// [`Error::SettingsParse`] if its content is not a settings object.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::SettingsRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::SettingsParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read settings from `path`, falling back to defaults.
    ///
    /// A missing file is not reported. Any other failure is logged as a
    /// warning.
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Self::default();
        }
        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                tracing::warn!("{e}; using default settings");
                Self::default()
            }
        }
    }

    /// Write the whole record to `path`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SettingsWrite`] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let write_err = |source: std::io::Error| Error::SettingsWrite {
            path: path.to_path_buf(),
            source,
        };
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| write_err(std::io::Error::other(e)))?;
        std::fs::write(path, json).map_err(write_err)
    }

    /// Placement parameters described by these settings.
    #[must_use]
    pub fn placement(&self) -> Placement {
        Placement {
            position: self.position,
            scale_percent: self.scale,
            opacity_percent: self.opacity,
            repeat: self.repeat_logo,
        }
    }

    /// Copy `placement` into these settings.
    pub fn set_placement(&mut self, placement: &Placement) {
        self.position = placement.position;
        self.scale = placement.scale_percent;
        self.opacity = placement.opacity_percent;
        self.repeat_logo = placement.repeat;
    }

    /// Logo path, or `None` if unset.
    #[must_use]
    pub fn logo(&self) -> Option<PathBuf> {
        non_empty_path(&self.logo_path)
    }

    /// Output directory, or `None` if unset.
    #[must_use]
    pub fn output_dir(&self) -> Option<PathBuf> {
        non_empty_path(&self.output_dir)
    }
}

fn non_empty_path(s: &str) -> Option<PathBuf> {
    if s.is_empty() {
        None
    } else {
        Some(PathBuf::from(s))
    }
}
