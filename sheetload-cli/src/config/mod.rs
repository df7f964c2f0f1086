//! Run configuration
//!
//! A [`Config`] is resolved once at startup from three layers, highest
//! precedence first: command-line flags / environment variables (both handled
//! by clap), an optional TOML file, and the built-in defaults below. The
//! resolved value is passed explicitly to everything that needs it.

pub mod file;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::str::FromStr;

use crate::naming::Ident;

pub use file::FileConfig;

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 5432;
pub const DEFAULT_DATABASE: &str = "postgres";
pub const DEFAULT_USER: &str = "postgres";
pub const DEFAULT_WORKBOOK: &str = "workbook.xlsx";
pub const DEFAULT_SCHEMA: &str = "public";
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// How existing table contents are treated before loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Drop and recreate the table
    #[default]
    Replace,
    /// Keep the table, delete its rows
    Truncate,
    /// Keep the table and its rows
    Append,
}

impl LoadMode {
    /// Replace and truncate both start from an empty table
    pub fn starts_empty(&self) -> bool {
        matches!(self, LoadMode::Replace | LoadMode::Truncate)
    }
}

impl std::fmt::Display for LoadMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadMode::Replace => write!(f, "replace"),
            LoadMode::Truncate => write!(f, "truncate"),
            LoadMode::Append => write!(f, "append"),
        }
    }
}

impl FromStr for LoadMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "replace" => Ok(LoadMode::Replace),
            "truncate" => Ok(LoadMode::Truncate),
            "append" => Ok(LoadMode::Append),
            other => Err(format!(
                "invalid load mode '{}', expected one of: replace, truncate, append",
                other
            )),
        }
    }
}

/// What to do when a sheet fails to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the run at the first failing sheet
    #[default]
    Abort,
    /// Report the failing sheet and continue with the next one
    Skip,
}

impl std::fmt::Display for ErrorPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorPolicy::Abort => write!(f, "abort"),
            ErrorPolicy::Skip => write!(f, "skip"),
        }
    }
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "abort" => Ok(ErrorPolicy::Abort),
            "skip" => Ok(ErrorPolicy::Skip),
            other => Err(format!(
                "invalid error policy '{}', expected one of: abort, skip",
                other
            )),
        }
    }
}

/// Connection settings for the target PostgreSQL database
#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

impl std::fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

/// What to load and how
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadConfig {
    pub workbook: PathBuf,
    /// Target schema, validated against the identifier allow-list
    pub schema: Ident,
    pub mode: LoadMode,
    /// Maximum rows per INSERT statement
    pub batch_size: usize,
    pub on_error: ErrorPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database: DatabaseConfig,
    pub load: LoadConfig,
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    pub workbook: Option<PathBuf>,
    pub schema: Option<String>,
    pub mode: Option<LoadMode>,
    pub batch_size: Option<usize>,
    pub on_error: Option<ErrorPolicy>,
}

impl Config {
    /// Merge overrides over the file config over the defaults
    pub fn resolve(overrides: ConfigOverrides, file: FileConfig) -> Result<Self> {
        let db = file.database;
        let load = file.load;

        let database = DatabaseConfig {
            host: overrides
                .host
                .or(db.host)
                .unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port: overrides.port.or(db.port).unwrap_or(DEFAULT_PORT),
            database: overrides
                .database
                .or(db.database)
                .unwrap_or_else(|| DEFAULT_DATABASE.to_string()),
            user: overrides
                .user
                .or(db.user)
                .unwrap_or_else(|| DEFAULT_USER.to_string()),
            password: overrides.password.or(db.password).unwrap_or_default(),
        };

        let schema_name = overrides
            .schema
            .or(load.schema)
            .unwrap_or_else(|| DEFAULT_SCHEMA.to_string());
        let schema = Ident::parse(&schema_name)
            .with_context(|| format!("Invalid target schema '{}'", schema_name))?;

        let batch_size = overrides
            .batch_size
            .or(load.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            anyhow::bail!("Batch size must be at least 1");
        }

        let load = LoadConfig {
            workbook: overrides
                .workbook
                .or(load.workbook)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_WORKBOOK)),
            schema,
            mode: overrides.mode.or(load.mode).unwrap_or_default(),
            batch_size,
            on_error: overrides.on_error.or(load.on_error).unwrap_or_default(),
        };

        Ok(Config { database, load })
    }
}
