//! Durable store operations for agency metrics rows.
//!
//! One row per agency, keyed by name: created on first sight, updated
//! thereafter, never deleted by the pipeline. `updated_at` advances on every
//! successful write — the upsert bumps it past the previous value even when
//! two runs land within the same clock tick.

use anyhow::Result;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{AgencyMetrics, CfrReference, CountResult};

pub async fn upsert_agency_metrics(
    pool: &SqlitePool,
    name: &str,
    scope: &[CfrReference],
    totals: CountResult,
) -> Result<()> {
    let scope_json = serde_json::to_string(scope)?;
    let now = chrono::Utc::now().timestamp();

    sqlx::query(
        r#"
        INSERT INTO agency_metrics (name, scope, section_count, word_count, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            scope = excluded.scope,
            section_count = excluded.section_count,
            word_count = excluded.word_count,
            updated_at = MAX(excluded.updated_at, agency_metrics.updated_at + 1)
        "#,
    )
    .bind(name)
    .bind(&scope_json)
    .bind(totals.section_count as i64)
    .bind(totals.word_count as i64)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn list_agencies(pool: &SqlitePool) -> Result<Vec<AgencyMetrics>> {
    let rows = sqlx::query(
        "SELECT name, scope, section_count, word_count, updated_at FROM agency_metrics ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_metrics).collect())
}

pub async fn get_agency(pool: &SqlitePool, name: &str) -> Result<Option<AgencyMetrics>> {
    let row = sqlx::query(
        "SELECT name, scope, section_count, word_count, updated_at FROM agency_metrics WHERE name = ?",
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;

    Ok(row.as_ref().map(row_to_metrics))
}

pub async fn top_agencies_by_word_count(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<AgencyMetrics>> {
    let rows = sqlx::query(
        r#"
        SELECT name, scope, section_count, word_count, updated_at
        FROM agency_metrics
        ORDER BY word_count DESC, name
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(row_to_metrics).collect())
}

fn row_to_metrics(row: &SqliteRow) -> AgencyMetrics {
    let scope_json: String = row.get("scope");
    AgencyMetrics {
        name: row.get("name"),
        scope: serde_json::from_str(&scope_json)
            .unwrap_or(serde_json::Value::Array(Vec::new())),
        section_count: row.get("section_count"),
        word_count: row.get("word_count"),
        updated_at: row.get("updated_at"),
    }
}
