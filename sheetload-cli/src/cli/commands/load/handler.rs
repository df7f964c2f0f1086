//! Load command handler

use anyhow::{Context, Result};
use colored::*;
use std::time::Instant;

use super::LoadCommands;
use crate::config::{Config, FileConfig};
use crate::db;
use crate::run;
use crate::workbook::Workbook;

/// Resolve the configuration, load the workbook and report the outcome
pub async fn handle_load_command(args: LoadCommands) -> Result<()> {
    // Handle --no-color flag
    if args.no_color {
        colored::control::set_override(false);
    }

    let file_config = match &args.config {
        Some(path) => FileConfig::load(path)?,
        None => FileConfig::default(),
    };
    let config = Config::resolve(args.overrides(), file_config)
        .context("Invalid configuration")?;
    log::debug!("Resolved configuration: {:?}", config);

    let mut workbook = Workbook::open(&config.load.workbook)?;
    println!(
        "Workbook: {} ({} sheets)",
        workbook.path().display().to_string().cyan(),
        workbook.sheet_names().len()
    );
    println!(
        "Target:   {} schema {} (mode: {})",
        config.database.to_string().bright_green(),
        config.load.schema.as_str().bright_green(),
        config.load.mode.to_string().bold()
    );

    let pool = db::connect(&config.database).await?;

    let start = Instant::now();
    let summary = run::run(&pool, &config.load, &mut workbook).await;
    pool.close().await;

    summary.print();
    println!("Elapsed: {:.2}s", start.elapsed().as_secs_f64());

    if !summary.is_success() {
        let failure = &summary.failed[0];
        anyhow::bail!(
            "{} of {} sheets failed; first failure in '{}': {}",
            summary.failed.len(),
            summary.failed.len() + summary.loaded.len() + summary.not_attempted.len(),
            failure.sheet,
            failure.error
        );
    }

    Ok(())
}
