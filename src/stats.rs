//! Database statistics.
//!
//! Summarizes what has been scraped and indexed, and which embedding model
//! the retrieval table was built with. Used by `askdocs stats`.

use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;
use crate::table::{self, TableMeta};

/// Counts shown by `askdocs stats`.
#[derive(Debug, Clone, PartialEq)]
pub struct Stats {
    pub documents: i64,
    pub chunks: i64,
    pub avg_chunk_tokens: f64,
    pub max_chunk_tokens: i64,
    pub meta: Option<TableMeta>,
}

pub async fn collect(pool: &SqlitePool) -> Result<Stats> {
    let documents: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM scraped")
        .fetch_one(pool)
        .await?;

    let (chunks, avg, max): (i64, Option<f64>, Option<i64>) =
        sqlx::query_as("SELECT COUNT(*), AVG(n_tokens), MAX(n_tokens) FROM chunks")
            .fetch_one(pool)
            .await?;

    Ok(Stats {
        documents,
        chunks,
        avg_chunk_tokens: avg.unwrap_or(0.0),
        max_chunk_tokens: max.unwrap_or(0),
        meta: table::load_meta(pool).await?,
    })
}

/// Run the stats command: query the database and print a summary.
pub async fn run_stats(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let stats = collect(&pool).await?;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("askdocs database stats");
    println!("=======================");
    println!();
    println!("  Database:    {}", config.db.path.display());
    println!("  Size:        {}", format_bytes(db_size));
    println!();
    println!("  Documents:   {}", stats.documents);
    println!("  Chunks:      {}", stats.chunks);
    println!(
        "  Tokens:      {:.1} avg / {} max per chunk",
        stats.avg_chunk_tokens, stats.max_chunk_tokens
    );

    match &stats.meta {
        Some(meta) => {
            println!("  Model:       {} ({} dims)", meta.model, meta.dims);
            println!("  Built:       {}", meta.built_at);
            println!("  Digest:      {}", meta.corpus_digest);
        }
        None => println!("  Model:       not indexed"),
    }
    println!();

    pool.close().await;
    Ok(())
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
