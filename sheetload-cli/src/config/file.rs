//! Optional TOML configuration file
//!
//! ```toml
//! [database]
//! host = "10.0.0.5"
//! port = 5432
//! database = "plant"
//! user = "loader"
//! password = "secret"
//!
//! [load]
//! workbook = "data/alarms.xlsx"
//! schema = "public"
//! mode = "append"
//! batch_size = 500
//! on_error = "skip"
//! ```
//!
//! Every key is optional; missing keys fall through to the defaults.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::{ErrorPolicy, LoadMode};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database: FileDatabaseConfig,
    pub load: FileLoadConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileDatabaseConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileLoadConfig {
    pub workbook: Option<PathBuf>,
    pub schema: Option<String>,
    pub mode: Option<LoadMode>,
    pub batch_size: Option<usize>,
    pub on_error: Option<ErrorPolicy>,
}

impl FileConfig {
    /// Read and parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}
