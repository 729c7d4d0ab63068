//! Library-level pipeline tests with deterministic stand-ins for the
//! embedding and completion services.

use anyhow::Result;
use askdocs::config::Config;
use askdocs::{db, export, index, loader, migrate, table};
use askdocs_core::answer::{answer_question, create_context, AskOptions};
use askdocs_core::chunk::Chunker;
use askdocs_core::distance::DistanceMetric;
use askdocs_core::error::AskError;
use askdocs_core::provider::{CompletionClient, CompletionRequest, Embedder};
use askdocs_core::tokenizer::CharRatioCounter;
use async_trait::async_trait;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

/// Bag-of-words embedder: each word bumps one of `dims` buckets chosen by a
/// simple hash, so texts sharing words land close together.
struct HashEmbedder {
    model: String,
    dims: usize,
}

impl HashEmbedder {
    fn new(model: &str, dims: usize) -> Self {
        Self {
            model: model.to_string(),
            dims,
        }
    }

    fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dims];
        for word in text.split_whitespace() {
            let word = word
                .trim_matches(|c: char| !c.is_alphanumeric())
                .to_lowercase();
            if word.is_empty() {
                continue;
            }
            let h = word
                .bytes()
                .fold(2166136261u32, |h, b| (h ^ b as u32).wrapping_mul(16777619));
            v[h as usize % self.dims] += 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }
    fn dims(&self) -> usize {
        self.dims
    }
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }
}

struct RecordingCompleter {
    seen: Mutex<Vec<CompletionRequest>>,
}

#[async_trait]
impl CompletionClient for RecordingCompleter {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        self.seen.lock().unwrap().push(request.clone());
        Ok("HTML structures pages.".to_string())
    }
}

fn setup(tmp: &TempDir) -> Config {
    let root = tmp.path();
    let text_dir = root.join("text");
    fs::create_dir_all(&text_dir).unwrap();
    fs::write(
        text_dir.join("en-US_docs_Web_HTML.txt"),
        "HTML is the markup language that structures web pages.",
    )
    .unwrap();
    fs::write(
        text_dir.join("en-US_docs_Web_CSS.txt"),
        "CSS is the style sheet language that colors and lays out pages.",
    )
    .unwrap();
    fs::write(
        text_dir.join("en-US_docs_Web_JavaScript.txt"),
        "JavaScript is the scripting language that makes pages interactive.",
    )
    .unwrap();

    let toml = format!(
        "[db]\npath = \"{root}/askdocs.sqlite\"\n[corpus]\nroot = \"{root}/text\"\n",
        root = root.display()
    );
    toml::from_str(&toml).unwrap()
}

async fn build(config: &Config, embedder: &HashEmbedder) -> sqlx::SqlitePool {
    let pool = db::connect(config).await.unwrap();
    migrate::apply(&pool).await.unwrap();

    let docs = loader::scan_corpus(config).unwrap();
    table::save_scraped(&pool, &docs).await.unwrap();

    let pages = table::load_scraped(&pool).await.unwrap();
    let chunker = Chunker::new(1000, 1, CharRatioCounter::new(4));
    let (built, summary) = index::build_table(&pages, &chunker, embedder, 2, 2)
        .await
        .unwrap();
    assert_eq!(summary.documents, 3);
    assert_eq!(summary.chunks, 3);

    table::save_table(&pool, &built).await.unwrap();
    pool
}

#[tokio::test]
async fn test_index_then_retrieve() {
    let tmp = TempDir::new().unwrap();
    let config = setup(&tmp);
    let embedder = HashEmbedder::new("hash-64", 64);
    let pool = build(&config, &embedder).await;

    let loaded = table::load_table(&pool).await.unwrap();
    assert_eq!(loaded.model, "hash-64");
    assert_eq!(loaded.dims, 64);
    // Files load sorted by name: CSS, HTML, JavaScript
    assert!(loaded.rows[0].text.starts_with("en-US/docs/Web/CSS. "));
    assert!(loaded.rows[1].text.starts_with("en-US/docs/Web/HTML. "));

    let context = create_context(
        &embedder,
        &loaded,
        "What is the HTML markup language?",
        1800,
        DistanceMetric::Cosine,
    )
    .await
    .unwrap();
    assert_eq!(context.indices[0], 1);
    assert_eq!(context.indices.len(), 3);
    assert!(context.text.contains("\n\n###\n\n"));
}

#[tokio::test]
async fn test_context_budget_limits_chunks() {
    let tmp = TempDir::new().unwrap();
    let config = setup(&tmp);
    let embedder = HashEmbedder::new("hash-64", 64);
    let pool = build(&config, &embedder).await;
    let loaded = table::load_table(&pool).await.unwrap();

    let first = loaded.rows[1].token_count + 4;
    let context = create_context(
        &embedder,
        &loaded,
        "HTML markup structures",
        first,
        DistanceMetric::Cosine,
    )
    .await
    .unwrap();
    assert_eq!(context.indices, vec![1]);
    assert!(!context.text.contains("###"));
}

#[tokio::test]
async fn test_answer_end_to_end() {
    let tmp = TempDir::new().unwrap();
    let config = setup(&tmp);
    let embedder = HashEmbedder::new("hash-64", 64);
    let pool = build(&config, &embedder).await;
    let loaded = table::load_table(&pool).await.unwrap();

    let completer = RecordingCompleter {
        seen: Mutex::new(Vec::new()),
    };
    let answer = answer_question(
        &embedder,
        &completer,
        &loaded,
        "What is HTML?",
        &AskOptions::default(),
    )
    .await
    .unwrap();

    assert_eq!(answer.text, "HTML structures pages.");
    let seen = completer.seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert!(seen[0].messages[0].content.contains("Question: What is HTML?"));
    assert!(seen[0].messages[0].content.contains("en-US/docs/Web/HTML"));
}

#[tokio::test]
async fn test_model_mismatch_rejected() {
    let tmp = TempDir::new().unwrap();
    let config = setup(&tmp);
    let pool = build(&config, &HashEmbedder::new("hash-64", 64)).await;
    let loaded = table::load_table(&pool).await.unwrap();

    let other = HashEmbedder::new("hash-32", 32);
    let err = create_context(&other, &loaded, "q", 1800, DistanceMetric::Cosine)
        .await
        .unwrap_err();
    assert!(matches!(err, AskError::Configuration(_)));
}

#[tokio::test]
async fn test_rebuild_replaces_table() {
    let tmp = TempDir::new().unwrap();
    let config = setup(&tmp);
    let embedder = HashEmbedder::new("hash-64", 64);
    let pool = build(&config, &embedder).await;
    let first = table::load_meta(&pool).await.unwrap().unwrap();

    fs::remove_file(tmp.path().join("text/en-US_docs_Web_CSS.txt")).unwrap();
    let docs = loader::scan_corpus(&config).unwrap();
    table::save_scraped(&pool, &docs).await.unwrap();
    let pages = table::load_scraped(&pool).await.unwrap();
    let chunker = Chunker::new(1000, 1, CharRatioCounter::new(4));
    let (built, _) = index::build_table(&pages, &chunker, &embedder, 64, 1)
        .await
        .unwrap();
    table::save_table(&pool, &built).await.unwrap();

    let loaded = table::load_table(&pool).await.unwrap();
    assert_eq!(loaded.len(), 2);
    let second = table::load_meta(&pool).await.unwrap().unwrap();
    assert_ne!(first.corpus_digest, second.corpus_digest);
}

#[tokio::test]
async fn test_export_round_trips_table() {
    let tmp = TempDir::new().unwrap();
    let config = setup(&tmp);
    let pool = build(&config, &HashEmbedder::new("hash-64", 64)).await;
    let saved = table::load_table(&pool).await.unwrap();
    pool.close().await;

    let out = tmp.path().join("out/table.json");
    export::run_export(&config, Some(&out)).await.unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(json["meta"]["model"], "hash-64");
    assert_eq!(json["meta"]["dims"], 64);
    let chunks = json["chunks"].as_array().unwrap();
    assert_eq!(chunks.len(), saved.len());
    assert_eq!(chunks.len(), 3);
    assert_eq!(chunks[1]["text"], saved.rows[1].text.as_str());
    assert_eq!(chunks[0]["embedding"].as_array().unwrap().len(), 64);
}
