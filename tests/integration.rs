use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

fn askdocs_binary() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_askdocs"))
}

fn setup_test_env() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().to_path_buf();

    let config_dir = root.join("config");
    fs::create_dir_all(&config_dir).unwrap();

    // Scraped pages, named the way the crawler writes them
    let text_dir = root.join("text");
    fs::create_dir_all(&text_dir).unwrap();
    fs::write(
        text_dir.join("en-US_docs_Web_HTML.txt"),
        "HTML is the markup language of the web.\nIt describes the structure of a page.",
    )
    .unwrap();
    fs::write(
        text_dir.join("en-US_docs_Web_CSS.txt"),
        "CSS\u{a0}describes how HTML elements are displayed.",
    )
    .unwrap();
    fs::write(
        text_dir.join("en-US_docs_MDN_contributors.txt"),
        "A list of names.",
    )
    .unwrap();
    fs::write(text_dir.join("README.md"), "not a page").unwrap();

    let config_content = format!(
        r#"[db]
path = "{root}/data/askdocs.sqlite"

[corpus]
root = "{root}/text"

[chunking]
chunk_token_limit = 500
"#,
        root = root.display()
    );

    let config_path = config_dir.join("askdocs.toml");
    fs::write(&config_path, config_content).unwrap();

    (tmp, config_path)
}

fn run_askdocs(config_path: &Path, args: &[&str]) -> (String, String, bool) {
    let binary = askdocs_binary();
    let output = Command::new(&binary)
        .arg("--config")
        .arg(config_path.to_str().unwrap())
        .args(args)
        .env_remove("OPENAI_API_KEY")
        .env_remove("TG_BOT_TOKEN")
        .output()
        .unwrap_or_else(|e| panic!("Failed to run askdocs binary at {:?}: {}", binary, e));

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let success = output.status.success();
    (stdout, stderr, success)
}

#[test]
fn test_init_creates_database() {
    let (tmp, config_path) = setup_test_env();

    let (stdout, stderr, success) = run_askdocs(&config_path, &["init"]);
    assert!(success, "init failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("initialized"));
    assert!(tmp.path().join("data/askdocs.sqlite").exists());
}

#[test]
fn test_init_idempotent() {
    let (_tmp, config_path) = setup_test_env();

    let (_, _, success1) = run_askdocs(&config_path, &["init"]);
    assert!(success1, "First init failed");

    let (_, _, success2) = run_askdocs(&config_path, &["init"]);
    assert!(success2, "Second init failed (not idempotent)");
}

#[test]
fn test_scrape_skips_and_counts() {
    let (_tmp, config_path) = setup_test_env();

    run_askdocs(&config_path, &["init"]);
    let (stdout, stderr, success) = run_askdocs(&config_path, &["scrape"]);
    assert!(success, "scrape failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("documents: 2"));
    assert!(stdout.contains("ok"));
}

#[test]
fn test_scrape_twice_replaces() {
    let (_tmp, config_path) = setup_test_env();

    run_askdocs(&config_path, &["init"]);
    run_askdocs(&config_path, &["scrape"]);
    run_askdocs(&config_path, &["scrape"]);

    let (stdout, stderr, success) = run_askdocs(&config_path, &["stats"]);
    assert!(success, "stats failed: stdout={}, stderr={}", stdout, stderr);
    assert!(stdout.contains("Documents:   2"));
    assert!(stdout.contains("Chunks:      0"));
    assert!(stdout.contains("not indexed"));
}

#[test]
fn test_index_without_api_key_fails() {
    let (_tmp, config_path) = setup_test_env();

    run_askdocs(&config_path, &["init"]);
    run_askdocs(&config_path, &["scrape"]);
    let (_, stderr, success) = run_askdocs(&config_path, &["index"]);
    assert!(!success);
    assert!(stderr.contains("OPENAI_API_KEY"));
}

#[test]
fn test_ask_without_table_fails_cleanly() {
    let (_tmp, config_path) = setup_test_env();

    run_askdocs(&config_path, &["init"]);
    let (stdout, stderr, success) = run_askdocs(&config_path, &["ask", "What is HTML?"]);
    assert!(!success);
    assert!(stdout.is_empty());
    assert!(stderr.contains("configuration error"));
    assert!(stderr.contains("askdocs index"));
}

#[test]
fn test_missing_config_fails() {
    let tmp = TempDir::new().unwrap();
    let (_, stderr, success) = run_askdocs(&tmp.path().join("nope.toml"), &["stats"]);
    assert!(!success);
    assert!(stderr.contains("Failed to read config file"));
}
