//! Scrape and index pipeline.
//!
//! `scrape` loads the corpus directory into the `scraped` table. `index`
//! reads it back, chunks every page under the token limit, embeds the
//! chunks with a bounded number of concurrent requests, and replaces the
//! retrieval table. Embedding failures are fatal: the previous table stays
//! in place untouched.

use anyhow::{bail, Context, Result};
use askdocs_core::chunk::Chunker;
use askdocs_core::models::{Chunk, EmbeddedChunk, RetrievalTable};
use askdocs_core::provider::Embedder;
use askdocs_core::tokenizer::TokenCounter;
use futures::stream::{self, StreamExt, TryStreamExt};

use crate::config::Config;
use crate::db;
use crate::embedding::OpenAIEmbedder;
use crate::loader;
use crate::table::{self, ScrapedPage};
use crate::tokenizer::Cl100kCounter;

/// Counts reported after an index build.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSummary {
    pub documents: usize,
    pub chunks: usize,
    pub avg_doc_tokens: f64,
}

pub async fn run_scrape(config: &Config) -> Result<()> {
    let documents = loader::scan_corpus(config)?;
    tracing::info!(
        root = %config.corpus.root.display(),
        documents = documents.len(),
        "corpus loaded"
    );

    let pool = db::connect(config).await?;
    table::save_scraped(&pool, &documents).await?;

    println!("scrape");
    println!("  documents: {}", documents.len());
    println!("ok");

    pool.close().await;
    Ok(())
}

/// Build the retrieval table with the OpenAI embedder.
///
/// `concurrency` overrides `embedding.concurrency` when given.
pub async fn run_index(config: &Config, concurrency: Option<usize>) -> Result<()> {
    let pool = db::connect(config).await?;
    let pages = table::load_scraped(&pool).await?;
    if pages.is_empty() {
        bail!("No scraped documents found. Run `askdocs scrape` first.");
    }

    let chunker = Chunker::new(
        config.chunking.chunk_token_limit,
        config.chunking.chars_per_token,
        Cl100kCounter::new()?,
    );
    let embedder = OpenAIEmbedder::new(&config.embedding)?;
    let concurrency = concurrency.unwrap_or(config.embedding.concurrency).max(1);

    let (table, summary) = build_table(
        &pages,
        &chunker,
        &embedder,
        config.embedding.batch_size,
        concurrency,
    )
    .await?;

    let meta = table::save_table(&pool, &table).await?;

    println!("index");
    println!("  documents: {}", summary.documents);
    println!("  chunks: {}", summary.chunks);
    println!("  avg tokens/document: {:.1}", summary.avg_doc_tokens);
    println!("  model: {} ({} dims)", meta.model, meta.dims);
    println!("ok");

    pool.close().await;
    Ok(())
}

/// Chunk and embed `pages` into a retrieval table tagged with the
/// embedder's model and dimensionality.
pub async fn build_table<C: TokenCounter>(
    pages: &[ScrapedPage],
    chunker: &Chunker<C>,
    embedder: &dyn Embedder,
    batch_size: usize,
    concurrency: usize,
) -> Result<(RetrievalTable, IndexSummary)> {
    let texts: Vec<Option<String>> = pages.iter().map(ScrapedPage::indexed_text).collect();

    let counted: Vec<usize> = texts
        .iter()
        .flatten()
        .map(|t| chunker.counter().count(t))
        .collect();
    let avg_doc_tokens = if counted.is_empty() {
        0.0
    } else {
        counted.iter().sum::<usize>() as f64 / counted.len() as f64
    };
    tracing::info!(
        documents = pages.len(),
        avg_tokens = avg_doc_tokens,
        "counted document tokens"
    );

    let chunks = chunker.chunk_corpus(texts.iter().map(|t| t.as_deref()));
    tracing::info!(chunks = chunks.len(), "chunked corpus");

    let rows = embed_chunks(embedder, chunks, batch_size, concurrency).await?;

    let summary = IndexSummary {
        documents: pages.len(),
        chunks: rows.len(),
        avg_doc_tokens,
    };
    let table = RetrievalTable::new(embedder.model_name(), embedder.dims(), rows);
    Ok((table, summary))
}

/// Embed chunks in batches with at most `concurrency` requests in flight.
///
/// Output order matches input order. The first failed batch aborts the run.
pub async fn embed_chunks(
    embedder: &dyn Embedder,
    chunks: Vec<Chunk>,
    batch_size: usize,
    concurrency: usize,
) -> Result<Vec<EmbeddedChunk>> {
    let batch_size = batch_size.max(1);
    let dims = embedder.dims();
    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let total_batches = texts.len().div_ceil(batch_size);

    let vectors: Vec<Vec<Vec<f32>>> = stream::iter(texts.chunks(batch_size).enumerate())
        .map(|(batch_idx, batch)| async move {
            let vectors = embedder.embed(batch).await.with_context(|| {
                format!("embedding batch {}/{} failed", batch_idx + 1, total_batches)
            })?;
            if vectors.len() != batch.len() {
                bail!(
                    "embedding batch {} returned {} vectors for {} inputs",
                    batch_idx + 1,
                    vectors.len(),
                    batch.len()
                );
            }
            if let Some(bad) = vectors.iter().find(|v| v.len() != dims) {
                bail!(
                    "embedding batch {} returned a {}-dimension vector, expected {}",
                    batch_idx + 1,
                    bad.len(),
                    dims
                );
            }
            tracing::debug!(batch = batch_idx + 1, total = total_batches, "embedded batch");
            Ok::<_, anyhow::Error>(vectors)
        })
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    Ok(chunks
        .into_iter()
        .zip(vectors.into_iter().flatten())
        .map(|(chunk, embedding)| EmbeddedChunk::new(chunk, embedding))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use askdocs_core::tokenizer::CharRatioCounter;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Encodes each text's length; fails on the configured call number.
    struct LengthEmbedder {
        calls: AtomicUsize,
        fail_on: Option<usize>,
    }

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn model_name(&self) -> &str {
            "len"
        }
        fn dims(&self) -> usize {
            2
        }
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(call) {
                bail!("HTTP 500");
            }
            Ok(texts.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }
    }

    fn embedder(fail_on: Option<usize>) -> LengthEmbedder {
        LengthEmbedder {
            calls: AtomicUsize::new(0),
            fail_on,
        }
    }

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            token_count: 1,
        }
    }

    fn page(title: &str, text: Option<&str>) -> ScrapedPage {
        ScrapedPage {
            title: title.to_string(),
            text: text.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_embed_preserves_order_across_batches() {
        let chunks: Vec<Chunk> = ["a", "bb", "ccc", "dddd", "eeeee"]
            .iter()
            .map(|t| chunk(t))
            .collect();
        let rows = embed_chunks(&embedder(None), chunks, 2, 3).await.unwrap();
        let lens: Vec<f32> = rows.iter().map(|r| r.embedding[0]).collect();
        assert_eq!(lens, vec![1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(rows[2].text, "ccc");
    }

    #[tokio::test]
    async fn test_failed_batch_aborts() {
        let chunks: Vec<Chunk> = ["a", "b", "c"].iter().map(|t| chunk(t)).collect();
        let err = embed_chunks(&embedder(Some(1)), chunks, 1, 1).await.unwrap_err();
        assert!(format!("{:#}", err).contains("HTTP 500"));
    }

    #[tokio::test]
    async fn test_build_table_skips_empty_pages() {
        let pages = vec![
            page("en-US/docs/A", Some("alpha")),
            page("en-US/docs/B", None),
            page("en-US/docs/C", Some("gamma")),
        ];
        let chunker = Chunker::new(1000, 1, CharRatioCounter::new(1));
        let (table, summary) = build_table(&pages, &chunker, &embedder(None), 64, 4)
            .await
            .unwrap();

        assert_eq!(table.model, "len");
        assert_eq!(table.dims, 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.rows[0].text, "en-US/docs/A. alpha");
        assert_eq!(table.rows[0].token_count, 19);
        assert_eq!(summary.documents, 3);
        assert_eq!(summary.chunks, 2);
        assert!((summary.avg_doc_tokens - 19.0).abs() < 1e-9);
    }
}
