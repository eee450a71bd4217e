use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply_schema(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Idempotent schema creation, shared by `regc init` and tests.
pub async fn apply_schema(pool: &SqlitePool) -> Result<()> {
    // Create agency metrics table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS agency_metrics (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            scope TEXT NOT NULL DEFAULT '[]',
            section_count INTEGER NOT NULL DEFAULT 0,
            word_count INTEGER NOT NULL DEFAULT 0,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Index for the top-by-word-count query
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_agency_metrics_word_count ON agency_metrics(word_count DESC)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
