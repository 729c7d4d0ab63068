//! Context assembly: rank the retrieval table against a query vector and
//! pack the nearest chunks into a token budget.
//!
//! # Algorithm
//!
//! 1. Compute the distance from the query to every row.
//! 2. Stable-sort ascending; equal distances keep table order.
//! 3. Walk the sorted rows, adding `token_count + 4` to a running total.
//! 4. Stop at the first row that would push the total past the budget.
//!    Rows already taken stay; no smaller row is tried afterwards.
//! 5. Join the selected texts with [`CONTEXT_DELIMITER`].

use crate::distance::DistanceMetric;
use crate::models::RetrievalTable;

/// Separator placed between selected chunk texts.
pub const CONTEXT_DELIMITER: &str = "\n\n###\n\n";

/// Tokens charged per selected chunk on top of its own count.
pub const PER_CHUNK_OVERHEAD: usize = 4;

/// A table row and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ranked {
    pub index: usize,
    pub distance: f32,
}

/// The assembled context and what went into it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSelection {
    /// Selected chunk texts joined by [`CONTEXT_DELIMITER`]. Empty when
    /// nothing fits.
    pub text: String,
    /// Table row indices, in selection order.
    pub indices: Vec<usize>,
    /// Budget consumed, overhead included.
    pub tokens: usize,
}

impl ContextSelection {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Rank every row of `table` by distance to `query`, nearest first.
pub fn rank(query: &[f32], table: &RetrievalTable, metric: DistanceMetric) -> Vec<Ranked> {
    let mut ranked: Vec<Ranked> = table
        .rows
        .iter()
        .enumerate()
        .map(|(index, row)| Ranked {
            index,
            distance: metric.distance(query, &row.embedding),
        })
        .collect();

    // `sort_by` is stable, so ties keep table order. NaN sorts last.
    ranked.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    ranked
}

/// Greedily pack ranked rows into `max_tokens`.
pub fn assemble(table: &RetrievalTable, ranked: &[Ranked], max_tokens: usize) -> ContextSelection {
    let mut selection = ContextSelection::default();
    let mut texts: Vec<&str> = Vec::new();

    for r in ranked {
        let Some(row) = table.rows.get(r.index) else {
            continue;
        };
        let next = selection.tokens + row.token_count + PER_CHUNK_OVERHEAD;
        if next > max_tokens {
            break;
        }
        selection.tokens = next;
        selection.indices.push(r.index);
        texts.push(&row.text);
    }

    selection.text = texts.join(CONTEXT_DELIMITER);
    selection
}

/// [`rank`] then [`assemble`].
pub fn select(
    query: &[f32],
    table: &RetrievalTable,
    metric: DistanceMetric,
    max_tokens: usize,
) -> ContextSelection {
    let ranked = rank(query, table, metric);
    assemble(table, &ranked, max_tokens)
}
