//! Loading, interpolation and playback options with TOML preset support.
//!
//! Options serialize to/from TOML so a host can keep named presets in a
//! directory and a `trajview.toml` next to the binary.

mod interpolation;
mod loading;
mod playback;

use std::path::{Path, PathBuf};

pub use interpolation::InterpolationOptions;
pub use loading::LoadOptions;
pub use playback::PlaybackOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::TrajviewError;

/// Top-level options container. All sub-structs use `#[serde(default)]` so
/// partial TOML files (e.g. only overriding `[playback]`) work correctly.
#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Default, JsonSchema,
)]
#[serde(default)]
pub struct Options {
    /// File format and preprocessing.
    pub loading: LoadOptions,
    /// Spline boundary and output wrapping.
    pub interpolation: InterpolationOptions,
    /// Playback clock parameters.
    pub playback: PlaybackOptions,
}

impl Options {
    /// Generate JSON Schema describing the UI-exposed options.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Options)
    }

    /// Load options from a TOML file. Missing fields use defaults.
    ///
    /// # Errors
    ///
    /// Returns [`TrajviewError::Io`] if the file cannot be read and
    /// [`TrajviewError::OptionsParse`] if it is not valid options TOML.
    pub fn load(path: &Path) -> Result<Self, TrajviewError> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Parse options from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`TrajviewError::OptionsParse`] on malformed input.
    pub fn from_toml(content: &str) -> Result<Self, TrajviewError> {
        toml::from_str(content)
            .map_err(|e| TrajviewError::OptionsParse(e.to_string()))
    }

    /// Render every option, defaults included, as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`TrajviewError::OptionsParse`] if serialization fails.
    pub fn to_toml(&self) -> Result<String, TrajviewError> {
        toml::to_string_pretty(self)
            .map_err(|e| TrajviewError::OptionsParse(e.to_string()))
    }

    /// Write the options to `path`, creating missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns I/O errors from creating the directory or writing the file.
    pub fn save(&self, path: &Path) -> Result<(), TrajviewError> {
        let content = self.to_toml()?;
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                std::fs::create_dir_all(dir)?;
            }
            _ => {}
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// File backing the preset `name` in `dir`.
    pub fn preset_path(dir: &Path, name: &str) -> PathBuf {
        dir.join(format!("{name}.toml"))
    }

    /// Sorted names of the `.toml` presets in `dir`; empty if `dir` is
    /// unreadable.
    #[must_use]
    pub fn list_presets(dir: &Path) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| path.extension().is_some_and(|ext| ext == "toml"))
            .filter_map(|path| {
                path.file_stem().and_then(|s| s.to_str()).map(str::to_owned)
            })
            .collect();
        names.sort_unstable();
        names
    }
}
