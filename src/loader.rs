//! Corpus directory loader.
//!
//! Reads every file with the configured extension directly under
//! `corpus.root` and turns it into a [`Document`]. The file stem encodes the
//! page path with `_` in place of `/`, so `en-US_docs_Web_API.txt` becomes
//! the identifier `en-US/docs/Web/API`.

use anyhow::{bail, Context, Result};
use askdocs_core::models::Document;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::Path;
use walkdir::WalkDir;

use crate::config::Config;

/// Load the corpus, sorted by file name.
///
/// # Errors
///
/// Fails if the root is missing, a skip pattern is not a valid glob, or any
/// selected file cannot be read as UTF-8.
pub fn scan_corpus(config: &Config) -> Result<Vec<Document>> {
    let corpus = &config.corpus;
    let root = &corpus.root;
    if !root.is_dir() {
        bail!("Corpus root does not exist: {}", root.display());
    }

    let skip_set = build_globset(&corpus.skip_patterns)?;
    let extension = corpus.extension.trim_start_matches('.');

    let mut documents = Vec::new();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some(extension) {
            continue;
        }

        let file_name = entry.file_name().to_string_lossy().to_string();
        let id = identifier_for(path);
        if id.is_empty() {
            tracing::debug!(file = %file_name, "skipping file with empty identifier");
            continue;
        }

        if skip_set.is_match(&id) || skip_set.is_match(&file_name) {
            tracing::debug!(id = %id, "skipped by pattern");
            continue;
        }

        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read corpus file: {}", path.display()))?;

        tracing::debug!(id = %id, bytes = raw.len(), "loaded");
        documents.push(Document {
            id,
            text: normalize_whitespace(&raw),
        });
    }

    Ok(documents)
}

/// File stem with every `_` turned back into `/`.
fn identifier_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().replace('_', "/"))
        .unwrap_or_default()
}

/// Flatten line breaks into single spaces.
///
/// Real `\n`/`\r`, the escaped two-character `\n` sequence, and U+00A0 all
/// become a space; runs of spaces then collapse to one.
pub fn normalize_whitespace(text: &str) -> String {
    let replaced = text
        .replace("\\n", " ")
        .replace(['\n', '\r', '\u{a0}'], " ");

    let mut out = String::with_capacity(replaced.len());
    let mut prev_space = false;
    for c in replaced.chars() {
        if c == ' ' {
            if !prev_space {
                out.push(c);
            }
            prev_space = true;
        } else {
            out.push(c);
            prev_space = false;
        }
    }
    out
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(
            Glob::new(pattern).with_context(|| format!("Invalid skip pattern: {}", pattern))?,
        );
    }
    Ok(builder.build()?)
}
