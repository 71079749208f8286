use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cellsync::{ColumnMapping, SyncTargetConfig, TrafficTable};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Environment variable holding the Drive bearer token.
pub const DRIVE_TOKEN_VAR: &str = "CELLSYNC_DRIVE_TOKEN";

/// Environment variable naming the root directory when the config does not.
pub const ROOT_VAR: &str = "CELLSYNC_ROOT";

/// Top-level application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub root_directory: Option<PathBuf>,
    #[serde(default = "default_database")]
    pub database: PathBuf,
    #[serde(default)]
    pub drive: DriveConfig,
    #[serde(default)]
    pub sync: Vec<SyncTargetConfig>,
    #[serde(default = "default_ingest_jobs")]
    pub ingest: Vec<IngestEntry>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            root_directory: None,
            database: default_database(),
            drive: DriveConfig::default(),
            sync: Vec::new(),
            ingest: default_ingest_jobs(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DriveConfig {
    /// Override for the Drive API host, e.g. a local mock.
    pub api_base_url: Option<String>,
}

/// One table load: which vendors to read and from where.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IngestEntry {
    pub table: String,
    /// Directory with one subdirectory per vendor.
    pub input_path: PathBuf,
    /// Falls back to the table's vendor list when empty.
    #[serde(default)]
    pub vendors: Vec<String>,
    /// Watermark; when absent the newest date already in the table is used.
    pub last_date: Option<NaiveDate>,
    /// Per-vendor column layouts that differ from the table default.
    #[serde(default)]
    pub columns: BTreeMap<String, ColumnMapping>,
}

impl IngestEntry {
    fn for_table(table: TrafficTable, input_path: &str) -> Self {
        Self {
            table: table.name.to_owned(),
            input_path: input_path.into(),
            vendors: table.default_vendors.iter().map(|v| (*v).to_owned()).collect(),
            last_date: None,
            columns: BTreeMap::new(),
        }
    }
}

fn default_database() -> PathBuf {
    "warehouse.db".into()
}

/// Built-in jobs: the LTE and UMTS daily traffic loads.
pub fn default_ingest_jobs() -> Vec<IngestEntry> {
    vec![
        IngestEntry::for_table(TrafficTable::LTE_CELL_TRAFFIC_DAILY, "input/daily_lte_traffic_cell"),
        IngestEntry::for_table(TrafficTable::UMTS_CELL_TRAFFIC_DAILY, "input/daily_umts_traffic_cell"),
    ]
}

impl AppConfig {
    /// Root directory: config value, then `CELLSYNC_ROOT`, then the working directory.
    pub fn root(&self) -> PathBuf {
        self.root_directory
            .clone()
            .or_else(|| std::env::var_os(ROOT_VAR).map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve a configured path against the root directory.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_owned()
        } else {
            self.root().join(path)
        }
    }

    pub fn database_path(&self) -> PathBuf {
        self.resolve(&self.database)
    }
}

/// Config file path: `~/.config/cellsync/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("cellsync").join("config.toml"))
}

/// Load config from `explicit`, or from the default location.
///
/// A missing default file yields the built-in configuration; an explicit
/// path must exist. A file that fails to parse is always an error.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => path.to_owned(),
        None => match config_path() {
            Some(path) if path.exists() => path,
            _ => {
                tracing::debug!("no config file found, using defaults");
                return Ok(AppConfig::default());
            }
        },
    };

    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config at {}", path.display()))?;
    parse_config(&contents).with_context(|| format!("failed to parse config at {}", path.display()))
}

pub fn parse_config(contents: &str) -> Result<AppConfig> {
    Ok(toml::from_str(contents)?)
}
