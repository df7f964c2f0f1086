//! PostgreSQL connection

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};

use crate::config::DatabaseConfig;

/// Connection options for the configured database
pub fn connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.database)
        .username(&config.user);

    if config.password.is_empty() {
        options
    } else {
        options.password(&config.password)
    }
}

/// Open the single connection used for the whole run
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    log::info!("Connecting to {}", config);

    PgPoolOptions::new()
        .max_connections(1)
        .connect_with(connect_options(config))
        .await
        .with_context(|| format!("Failed to connect to database {}", config))
}
