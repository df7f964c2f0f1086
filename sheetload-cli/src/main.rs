//! sheetload: load every sheet of a spreadsheet workbook into PostgreSQL
//!
//! Each sheet becomes one table in the target schema, shaped by
//! [`classify::classify`]:
//! - a sheet named `logs` becomes a strictly typed alarm log table
//! - a two-column `(id, text)` sheet becomes an idempotent lookup table
//! - anything else becomes a table of text columns
//!
//! Tables with a generated id keep their sequence ahead of the loaded ids so
//! later appends never collide.

mod classify;
mod cli;
mod config;
mod db;
mod load;
mod naming;
mod run;
mod schema;
mod sequence;
mod workbook;

use anyhow::Result;
use clap::Parser;

use crate::cli::Cli;

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // A .env file may provide PG* and SHEETLOAD_* variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    cli::commands::load::handler::handle_load_command(cli.load).await
}
