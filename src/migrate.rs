use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    apply(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create all tables on an open pool. Idempotent.
pub async fn apply(pool: &SqlitePool) -> Result<()> {
    // Pre-chunking documents, one row per scraped page
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS scraped (
            position INTEGER PRIMARY KEY,
            title TEXT NOT NULL,
            text TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Retrieval table: chunk text, token count, embedding
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            position INTEGER PRIMARY KEY,
            text TEXT NOT NULL,
            n_tokens INTEGER NOT NULL,
            embedding BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Model, dims, and build info for the retrieval table
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS table_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
