//! Database connection pool and schema migrations

use sqlx::{migrate::MigrateError, postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use tracing::info;
use ushare_shared::config::DatabaseSettings;

pub async fn create_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    info!(
        max_connections = settings.max_connections,
        min_connections = settings.min_connections,
        "Connecting to PostgreSQL"
    );

    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_seconds))
        .connect(&settings.url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
    info!("Running database migrations");
    sqlx::migrate!("./migrations").run(pool).await
}
