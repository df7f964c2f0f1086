//! Command-line interface

pub mod commands;

use clap::Parser;

pub use commands::load::LoadCommands;

#[derive(Parser, Debug)]
#[command(
    name = "sheetload",
    version,
    about = "Load every sheet of a spreadsheet workbook into PostgreSQL tables"
)]
pub struct Cli {
    #[command(flatten)]
    pub load: LoadCommands,

    /// Enable debug logging (RUST_LOG takes precedence)
    #[arg(short, long)]
    pub verbose: bool,
}
