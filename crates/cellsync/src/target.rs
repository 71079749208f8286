use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Extensions downloaded when a target does not list its own.
pub const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[".zip", ".tar", ".csv", ".xlsx", ".rar"];

/// Invalid configuration. Always fatal, raised before any I/O.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported sync mode: {0}")]
    UnsupportedMode(String),

    #[error("sync target for {0} has an empty remote folder id")]
    MissingFolderId(String),
}

/// How a target's staging directory is reconciled with remote storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Skip files already present locally, re-fetching only the most recent one.
    Delta,
    /// Re-download every eligible file.
    Replace,
}

impl FromStr for SyncMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "delta" => Ok(Self::Delta),
            "replace" => Ok(Self::Replace),
            other => Err(ConfigError::UnsupportedMode(other.to_owned())),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delta => write!(f, "delta"),
            Self::Replace => write!(f, "replace"),
        }
    }
}

/// A sync target as written in configuration, before validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyncTargetConfig {
    /// Staging directory, relative to the root directory unless absolute.
    pub local_path: PathBuf,
    pub remote_folder_id: String,
    pub subfolder_name: Option<String>,
    #[serde(default = "default_mode")]
    pub mode: String,
    #[serde(default)]
    pub skip_files: Vec<String>,
    pub allowed_extensions: Option<Vec<String>>,
}

fn default_mode() -> String {
    "delta".into()
}

/// A validated sync target. Immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTarget {
    pub local_path: PathBuf,
    pub remote_folder_id: String,
    pub subfolder_name: Option<String>,
    pub mode: SyncMode,
    pub skip_list: BTreeSet<String>,
    /// Lowercase, each with a leading dot.
    pub allowed_extensions: BTreeSet<String>,
}

impl SyncTarget {
    /// Validate a configured target, resolving its local path against `root`.
    pub fn from_config(config: &SyncTargetConfig, root: &Path) -> Result<Self, ConfigError> {
        let mode: SyncMode = config.mode.parse()?;

        if config.remote_folder_id.trim().is_empty() {
            return Err(ConfigError::MissingFolderId(
                config.local_path.display().to_string(),
            ));
        }

        let allowed_extensions = match &config.allowed_extensions {
            Some(exts) => exts.iter().map(|e| normalize_extension(e)).collect(),
            None => DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|e| (*e).to_owned())
                .collect(),
        };

        Ok(Self {
            local_path: root.join(&config.local_path),
            remote_folder_id: config.remote_folder_id.clone(),
            subfolder_name: config.subfolder_name.clone(),
            mode,
            skip_list: config.skip_files.iter().cloned().collect(),
            allowed_extensions,
        })
    }

    pub fn is_excluded(&self, file_name: &str) -> bool {
        self.skip_list.contains(file_name)
    }

    /// Case-insensitive suffix match against the allowed extensions.
    pub fn has_allowed_extension(&self, file_name: &str) -> bool {
        let lower = file_name.to_lowercase();
        self.allowed_extensions.iter().any(|ext| lower.ends_with(ext))
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
