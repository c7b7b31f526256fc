//! Database access for sightbot-detect
//!
//! The prediction store is a single SQLite database reached through one
//! process-wide pool, opened at startup and closed on shutdown.

pub mod predictions;

pub use predictions::{PredictionStore, SqlitePredictionStore};

use anyhow::{Context, Result};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Open the connection pool and create tables
///
/// `sqlite::memory:` URLs get a single connection that is never recycled, so
/// every query sees the same in-memory database.
pub async fn init_database_pool(database_url: &str) -> Result<SqlitePool> {
    tracing::debug!("Connecting to database: {}", database_url);

    let options = if database_url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(5)
    };

    let pool = options
        .connect(database_url)
        .await
        .with_context(|| format!("Failed to open prediction database {}", database_url))?;

    init_tables(&pool).await?;

    Ok(pool)
}

/// Create the prediction_summaries table if it doesn't exist
async fn init_tables(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS prediction_summaries (
            prediction_id TEXT PRIMARY KEY,
            img_name TEXT NOT NULL,
            document TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create prediction_summaries table")?;

    tracing::info!("Database tables initialized (prediction_summaries)");

    Ok(())
}
