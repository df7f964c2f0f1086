//! Load every sheet of a workbook, one after another
//!
//! Per sheet: sanitize the name, classify, plan the rows, establish the
//! schema, insert, resync the sequence. Each of those database steps commits
//! on its own; a failure part-way leaves whatever already committed in place
//! and a rerun is expected to fix it up.

use colored::*;
use sqlx::PgPool;
use std::collections::HashMap;

use crate::classify::{TableStrategy, classify};
use crate::config::{ErrorPolicy, LoadConfig};
use crate::load::{self, LoadError};
use crate::naming::Ident;
use crate::schema::{self, TargetTable};
use crate::workbook::SheetSource;

/// Why a sheet could not be loaded
#[derive(Debug)]
pub enum SheetError {
    /// The sheet could not be read from the workbook
    Read(anyhow::Error),
    /// The sheet's columns do not fit its table shape
    Load(LoadError),
    /// An earlier sheet of this run already maps to the same table
    TableNameCollision {
        sheet: String,
        table: String,
        first_sheet: String,
    },
    /// DDL or DML failed
    Database(anyhow::Error),
}

impl std::fmt::Display for SheetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SheetError::Read(err) => write!(f, "{:#}", err),
            SheetError::Load(err) => write!(f, "{}", err),
            SheetError::TableNameCollision {
                sheet,
                table,
                first_sheet,
            } => write!(
                f,
                "Sheet '{}' maps to table '{}', which sheet '{}' already loaded in this run",
                sheet, table, first_sheet
            ),
            SheetError::Database(err) => write!(f, "{:#}", err),
        }
    }
}

impl std::error::Error for SheetError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SheetError::Load(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LoadError> for SheetError {
    fn from(err: LoadError) -> Self {
        SheetError::Load(err)
    }
}

/// A sheet that loaded successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetReport {
    pub sheet: String,
    pub table: String,
    pub strategy: TableStrategy,
    pub rows: u64,
}

/// A sheet that failed
#[derive(Debug)]
pub struct SheetFailure {
    pub sheet: String,
    pub error: SheetError,
}

/// Outcome of a whole run
#[derive(Debug, Default)]
pub struct RunSummary {
    pub loaded: Vec<SheetReport>,
    pub failed: Vec<SheetFailure>,
    /// Sheets never attempted because the run stopped early
    pub not_attempted: Vec<String>,
}

impl RunSummary {
    pub fn total_rows(&self) -> u64 {
        self.loaded.iter().map(|r| r.rows).sum()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn print(&self) {
        println!();
        println!(
            "{} sheets loaded, {} failed, {} rows total",
            self.loaded.len().to_string().green(),
            if self.failed.is_empty() {
                self.failed.len().to_string().normal()
            } else {
                self.failed.len().to_string().red()
            },
            self.total_rows()
        );
        for failure in &self.failed {
            println!("  {} {}: {}", "✗".red(), failure.sheet, failure.error);
        }
        if !self.not_attempted.is_empty() {
            println!(
                "  {} not attempted: {}",
                "-".dimmed(),
                self.not_attempted.join(", ")
            );
        }
    }
}

/// Tracks which sheet produced each table name during a run
#[derive(Debug, Default)]
struct TableNames {
    owners: HashMap<Ident, String>,
}

impl TableNames {
    /// Claim `table` for `sheet`, failing if another sheet already has it
    fn claim(&mut self, table: &Ident, sheet: &str) -> Result<(), SheetError> {
        if let Some(first_sheet) = self.owners.get(table) {
            return Err(SheetError::TableNameCollision {
                sheet: sheet.to_string(),
                table: table.to_string(),
                first_sheet: first_sheet.clone(),
            });
        }
        self.owners.insert(table.clone(), sheet.to_string());
        Ok(())
    }
}

/// Load all sheets from `source` into the configured schema
pub async fn run<S: SheetSource>(pool: &PgPool, config: &LoadConfig, source: &mut S) -> RunSummary {
    let sheet_names = source.sheet_names();
    let mut summary = RunSummary::default();
    let mut tables = TableNames::default();

    log::info!(
        "Loading {} sheets into schema '{}' (mode: {}, on error: {})",
        sheet_names.len(),
        config.schema,
        config.mode,
        config.on_error
    );

    for (idx, sheet_name) in sheet_names.iter().enumerate() {
        match load_sheet(pool, config, source, sheet_name, &mut tables).await {
            Ok(report) => summary.loaded.push(report),
            Err(error) => {
                println!("{} {}: {}", "[FAILED]".red().bold(), sheet_name, error);
                log::error!("Sheet '{}' failed: {:?}", sheet_name, error);
                summary.failed.push(SheetFailure {
                    sheet: sheet_name.clone(),
                    error,
                });

                if config.on_error == ErrorPolicy::Abort {
                    summary.not_attempted = sheet_names[idx + 1..].to_vec();
                    break;
                }
                log::warn!("Skipping sheet '{}' and continuing", sheet_name);
            }
        }
    }

    summary
}

async fn load_sheet<S: SheetSource>(
    pool: &PgPool,
    config: &LoadConfig,
    source: &mut S,
    sheet_name: &str,
    tables: &mut TableNames,
) -> Result<SheetReport, SheetError> {
    let sheet = source.read_sheet(sheet_name).map_err(SheetError::Read)?;

    let table_name = Ident::sanitize(&sheet.name);
    tables.claim(&table_name, &sheet.name)?;

    let strategy = classify(&sheet.name, &sheet.columns);
    let table = TargetTable::for_strategy(strategy, &config.schema, &table_name, &sheet.columns);

    println!();
    println!(
        "{} {} ({}) → {} ({} rows)",
        "[Sheet]".cyan().bold(),
        sheet.name,
        strategy,
        table.qualified_name(),
        sheet.row_count()
    );

    // Validate before any DDL runs
    let plan = load::plan(&table, config.mode, &sheet)?;

    schema::synchronize(pool, &table, config.mode)
        .await
        .map_err(SheetError::Database)?;

    let rows = load::execute(pool, &table, &plan, config.batch_size)
        .await
        .map_err(SheetError::Database)?;

    println!(
        "{} Loaded {} rows into {}",
        "[OK]".green().bold(),
        rows,
        table.qualified_name()
    );
    log::info!("Sheet '{}' loaded as {} table {}", sheet.name, strategy, table.name);

    Ok(SheetReport {
        sheet: sheet.name.clone(),
        table: table.name.to_string(),
        strategy,
        rows,
    })
}
