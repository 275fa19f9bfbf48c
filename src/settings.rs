//! Persisted user settings.

use std::path::{Path, PathBuf};

use color_eyre::eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use cosmoclean_core::DEFAULT_TARGETS;

/// Settings stored in `settings.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Folder names searched for when no `--target` is given.
    pub target_folders: Vec<String>,
    /// Root of the last scan, used when no path is given.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_root_folder: Option<PathBuf>,
    /// Size worker count (0 = hardware parallelism).
    pub workers: usize,
    /// Compare folder names byte for byte.
    pub case_sensitive: bool,
    /// Count symbolic links at their own size.
    pub count_symlinks: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_folders: DEFAULT_TARGETS.iter().map(|s| s.to_string()).collect(),
            last_root_folder: None,
            workers: 0,
            case_sensitive: false,
            count_symlinks: false,
        }
    }
}

impl Settings {
    /// Default settings file location.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("cosmoclean").join("settings.toml"))
    }

    /// Load settings from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => {
                return Err(err).with_context(|| format!("Failed to read {}", path.display()));
            }
        };
        toml::from_str(&content).with_context(|| format!("Invalid settings in {}", path.display()))
    }

    /// Save settings to `path`, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize settings")?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Add a target name. Fails on blank names and duplicates.
    pub fn add_target(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Target name cannot be empty");
        }
        if self.target_folders.iter().any(|t| t == name) {
            bail!("Target {name:?} is already configured");
        }
        self.target_folders.push(name.to_string());
        Ok(())
    }

    /// Remove a target name. Returns `false` if it was not configured.
    pub fn remove_target(&mut self, name: &str) -> bool {
        let name = name.trim();
        let before = self.target_folders.len();
        self.target_folders.retain(|t| t != name);
        self.target_folders.len() != before
    }

    /// Rename a target name in place.
    pub fn rename_target(&mut self, old: &str, new: &str) -> Result<()> {
        let (old, new) = (old.trim(), new.trim());
        if new.is_empty() {
            bail!("Target name cannot be empty");
        }
        let Some(index) = self.target_folders.iter().position(|t| t == old) else {
            bail!("Target {old:?} is not configured");
        };
        if old != new && self.target_folders.iter().any(|t| t == new) {
            bail!("Target {new:?} is already configured");
        }
        self.target_folders[index] = new.to_string();
        Ok(())
    }

    /// Restore the built-in target list.
    pub fn reset_targets(&mut self) {
        self.target_folders = Self::default().target_folders;
    }
}
