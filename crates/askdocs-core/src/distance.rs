//! Distance metrics used to rank chunks against a query vector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::embedding::cosine_similarity;

/// Interchangeable distance policy. Smaller is closer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// `1 - cosine_similarity`.
    #[default]
    Cosine,
    /// Manhattan distance.
    L1,
    /// Euclidean distance.
    L2,
    /// Chebyshev (max-coordinate) distance.
    Linf,
}

impl DistanceMetric {
    /// Distance between two vectors of equal length.
    ///
    /// Callers validate dimensionality up front; on a length mismatch only
    /// the common prefix contributes to the norm-based metrics.
    pub fn distance(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => 1.0 - cosine_similarity(a, b),
            DistanceMetric::L1 => a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum(),
            DistanceMetric::L2 => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt(),
            DistanceMetric::Linf => a
                .iter()
                .zip(b)
                .map(|(x, y)| (x - y).abs())
                .fold(0.0f32, f32::max),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cosine" => Ok(DistanceMetric::Cosine),
            "l1" => Ok(DistanceMetric::L1),
            "l2" => Ok(DistanceMetric::L2),
            "linf" => Ok(DistanceMetric::Linf),
            other => anyhow::bail!(
                "Unknown distance metric: '{}'. Must be cosine, l1, l2, or linf.",
                other
            ),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::L1 => "l1",
            DistanceMetric::L2 => "l2",
            DistanceMetric::Linf => "linf",
        };
        f.write_str(name)
    }
}
