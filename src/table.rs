//! Persistence for the scraped pages and the retrieval table.
//!
//! Each stage is replaced as a whole inside one transaction, so a reader
//! never sees a half-written table. The retrieval table's model and
//! dimensionality are stored next to it in `table_meta` and checked before
//! any question is answered.

use anyhow::{bail, Context, Result};
use askdocs_core::embedding::{blob_to_vec, vec_to_blob};
use askdocs_core::models::{Document, EmbeddedChunk, RetrievalTable};
use serde::Serialize;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

/// One row of the `scraped` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedPage {
    pub title: String,
    /// `NULL` when the page had no body.
    pub text: Option<String>,
}

impl ScrapedPage {
    /// `"{title}. {text}"`, or `None` for a page without text.
    pub fn indexed_text(&self) -> Option<String> {
        self.text.as_ref().map(|text| {
            Document {
                id: self.title.clone(),
                text: text.clone(),
            }
            .indexed_text()
        })
    }
}

/// Build information stored alongside the retrieval table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMeta {
    pub model: String,
    pub dims: usize,
    pub built_at: String,
    pub corpus_digest: String,
}

/// Replace the `scraped` table with `documents`, in order.
pub async fn save_scraped(pool: &SqlitePool, documents: &[Document]) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM scraped").execute(&mut *tx).await?;

    for (position, doc) in documents.iter().enumerate() {
        sqlx::query("INSERT INTO scraped (position, title, text) VALUES (?, ?, ?)")
            .bind(position as i64)
            .bind(&doc.id)
            .bind(&doc.text)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(())
}

pub async fn load_scraped(pool: &SqlitePool) -> Result<Vec<ScrapedPage>> {
    let rows = sqlx::query("SELECT title, text FROM scraped ORDER BY position")
        .fetch_all(pool)
        .await?;

    Ok(rows
        .iter()
        .map(|row| ScrapedPage {
            title: row.get("title"),
            text: row.get("text"),
        })
        .collect())
}

/// Replace the retrieval table and its metadata.
pub async fn save_table(pool: &SqlitePool, table: &RetrievalTable) -> Result<TableMeta> {
    let meta = TableMeta {
        model: table.model.clone(),
        dims: table.dims,
        built_at: chrono::Utc::now().to_rfc3339(),
        corpus_digest: corpus_digest(&table.rows),
    };

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM table_meta")
        .execute(&mut *tx)
        .await?;

    for (position, row) in table.rows.iter().enumerate() {
        sqlx::query("INSERT INTO chunks (position, text, n_tokens, embedding) VALUES (?, ?, ?, ?)")
            .bind(position as i64)
            .bind(&row.text)
            .bind(row.token_count as i64)
            .bind(vec_to_blob(&row.embedding))
            .execute(&mut *tx)
            .await?;
    }

    let entries = [
        ("model", meta.model.clone()),
        ("dims", meta.dims.to_string()),
        ("built_at", meta.built_at.clone()),
        ("corpus_digest", meta.corpus_digest.clone()),
    ];
    for (key, value) in entries {
        sqlx::query("INSERT INTO table_meta (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(meta)
}

/// Metadata of the current retrieval table, if one has been built.
pub async fn load_meta(pool: &SqlitePool) -> Result<Option<TableMeta>> {
    let rows = sqlx::query("SELECT key, value FROM table_meta")
        .fetch_all(pool)
        .await?;
    if rows.is_empty() {
        return Ok(None);
    }

    let lookup = |key: &str| -> Result<String> {
        rows.iter()
            .find(|r| r.get::<String, _>("key") == key)
            .map(|r| r.get::<String, _>("value"))
            .ok_or_else(|| anyhow::anyhow!("table_meta is missing '{}'", key))
    };

    let dims = lookup("dims")?;
    Ok(Some(TableMeta {
        model: lookup("model")?,
        dims: dims
            .parse()
            .with_context(|| format!("table_meta has invalid dims '{}'", dims))?,
        built_at: lookup("built_at")?,
        corpus_digest: lookup("corpus_digest")?,
    }))
}

/// Load the full retrieval table, in stored order.
///
/// # Errors
///
/// Fails if the table has not been built or holds no rows.
pub async fn load_table(pool: &SqlitePool) -> Result<RetrievalTable> {
    let meta = load_meta(pool)
        .await?
        .ok_or_else(|| anyhow::anyhow!("No retrieval table found. Run `askdocs index` first."))?;

    let rows = sqlx::query("SELECT text, n_tokens, embedding FROM chunks ORDER BY position")
        .fetch_all(pool)
        .await?;
    if rows.is_empty() {
        bail!("Retrieval table is empty. Run `askdocs index` first.");
    }

    let chunks = rows
        .iter()
        .map(|row| {
            let n_tokens: i64 = row.get("n_tokens");
            let blob: Vec<u8> = row.get("embedding");
            EmbeddedChunk {
                text: row.get("text"),
                token_count: n_tokens as usize,
                embedding: blob_to_vec(&blob),
            }
        })
        .collect();

    Ok(RetrievalTable::new(meta.model, meta.dims, chunks))
}

/// SHA-256 over the chunk texts, in order, as lowercase hex.
pub fn corpus_digest(rows: &[EmbeddedChunk]) -> String {
    let mut hasher = Sha256::new();
    for row in rows {
        hasher.update((row.text.len() as u64).to_le_bytes());
        hasher.update(row.text.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}
