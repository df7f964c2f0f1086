//! Arguments of the load command

pub mod handler;

use clap::Args;
use std::path::PathBuf;

use crate::config::{ConfigOverrides, ErrorPolicy, LoadMode};

#[derive(Args, Debug, Clone)]
pub struct LoadCommands {
    /// Workbook to load (.xlsx, .xlsm, .xlsb, .xls, .ods)
    #[arg(env = "SHEETLOAD_WORKBOOK")]
    pub workbook: Option<PathBuf>,

    /// TOML config file with [database] and [load] tables
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Database host
    #[arg(long, env = "PGHOST")]
    pub host: Option<String>,

    /// Database port
    #[arg(long, env = "PGPORT")]
    pub port: Option<u16>,

    /// Database name
    #[arg(long = "dbname", env = "PGDATABASE")]
    pub database: Option<String>,

    /// Database user
    #[arg(long, env = "PGUSER")]
    pub user: Option<String>,

    /// Database password
    #[arg(long, env = "PGPASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Target schema (lowercase letters, digits and '_')
    #[arg(short, long, env = "SHEETLOAD_SCHEMA")]
    pub schema: Option<String>,

    /// How existing tables are treated: replace, truncate or append
    #[arg(short, long, env = "SHEETLOAD_MODE")]
    pub mode: Option<LoadMode>,

    /// Maximum rows per INSERT statement
    #[arg(long, env = "SHEETLOAD_BATCH_SIZE")]
    pub batch_size: Option<usize>,

    /// What to do when a sheet fails: abort or skip
    #[arg(long, env = "SHEETLOAD_ON_ERROR")]
    pub on_error: Option<ErrorPolicy>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

impl LoadCommands {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            database: self.database.clone(),
            user: self.user.clone(),
            password: self.password.clone(),
            workbook: self.workbook.clone(),
            schema: self.schema.clone(),
            mode: self.mode,
            batch_size: self.batch_size,
            on_error: self.on_error,
        }
    }
}
