//! Export the retrieval table as JSON.
//!
//! Produces the chunk texts, token counts, and embeddings together with the
//! table's build metadata, for inspection or loading into other tools.

use anyhow::Result;
use askdocs_core::models::EmbeddedChunk;
use serde::Serialize;
use std::path::Path;

use crate::config::Config;
use crate::db;
use crate::table::{self, TableMeta};

#[derive(Serialize)]
struct ExportData {
    meta: TableMeta,
    chunks: Vec<EmbeddedChunk>,
}

/// Export the retrieval table as JSON.
///
/// If `output` is `Some`, writes to that file path. Otherwise writes
/// to stdout for piping.
pub async fn run_export(config: &Config, output: Option<&Path>) -> Result<()> {
    let pool = db::connect(config).await?;

    let meta = table::load_meta(&pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No retrieval table found. Run `askdocs index` first."))?;
    let table = table::load_table(&pool).await?;
    let chunk_count = table.len();

    let data = ExportData {
        meta,
        chunks: table.rows,
    };
    let json = serde_json::to_string_pretty(&data)?;

    match output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            std::fs::write(path, &json)?;
            tracing::info!(chunks = chunk_count, path = %path.display(), "exported");
        }
        None => {
            println!("{}", json);
        }
    }

    pool.close().await;
    Ok(())
}
