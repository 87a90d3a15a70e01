//! Semantic skill similarity as a pluggable collaborator.
//!
//! The engine never computes embeddings itself. A `SkillSimilarity`
//! implementation supplies a score in its native range, and the extractor
//! maps it onto 0-100. When the collaborator fails, scoring falls back to
//! the exact-overlap ratio instead of propagating the error.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::{jaccard, skill_set};

/// Errors from a similarity collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimilarityError {
    #[error("Similarity service unavailable: {0}")]
    Unavailable(String),

    #[error("No similarity known for this skill pair")]
    Missing,

    #[error("Similarity {0} is outside the collaborator's declared range")]
    OutOfRange(f64),
}

/// Native output range of a similarity collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityRange {
    /// Scores in [0, 1]
    Unit,
    /// Cosine similarity in [-1, 1]
    #[default]
    Cosine,
}

impl SimilarityRange {
    /// Map a native score onto 0-100, or `None` if it is outside the range.
    pub fn to_percent(&self, score: f64) -> Option<f64> {
        if !score.is_finite() {
            return None;
        }
        match self {
            Self::Unit if (0.0..=1.0).contains(&score) => Some(score * 100.0),
            Self::Cosine if (-1.0..=1.0).contains(&score) => Some((score + 1.0) * 50.0),
            _ => None,
        }
    }
}

/// Trait for skill similarity collaborators (embedding services, lookup tables).
///
/// Implementations must be cheap and non-blocking: they are called from the
/// scoring hot path, possibly from many threads at once.
pub trait SkillSimilarity: Send + Sync {
    /// Similarity between two normalized skill lists.
    fn similarity(&self, a: &[String], b: &[String]) -> Result<f64, SimilarityError>;

    /// Range of values returned by `similarity`.
    fn range(&self) -> SimilarityRange {
        SimilarityRange::Cosine
    }

    /// Collaborator name for logging.
    fn name(&self) -> &'static str;
}

/// Rule-based similarity: the Jaccard ratio of the two skill sets.
///
/// This is also what scoring falls back to when a collaborator fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverlapSimilarity;

impl SkillSimilarity for OverlapSimilarity {
    fn similarity(&self, a: &[String], b: &[String]) -> Result<f64, SimilarityError> {
        Ok(jaccard(&skill_set(a), &skill_set(b)))
    }

    fn range(&self) -> SimilarityRange {
        SimilarityRange::Unit
    }

    fn name(&self) -> &'static str {
        "overlap"
    }
}

/// Similarities fetched ahead of a scoring batch.
///
/// Keyed by the normalized skill sets, so lookups are insensitive to case,
/// ordering and duplicates. A miss is reported as `SimilarityError::Missing`.
#[derive(Debug, Clone, Default)]
pub struct PrecomputedSimilarity {
    range: SimilarityRange,
    table: HashMap<(String, String), f64>,
}

impl PrecomputedSimilarity {
    pub fn new(range: SimilarityRange) -> Self {
        Self {
            range,
            table: HashMap::new(),
        }
    }

    /// Record the similarity for a pair of skill lists.
    pub fn insert(&mut self, a: &[String], b: &[String], score: f64) {
        self.table.insert((set_key(a), set_key(b)), score);
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl SkillSimilarity for PrecomputedSimilarity {
    fn similarity(&self, a: &[String], b: &[String]) -> Result<f64, SimilarityError> {
        let (ka, kb) = (set_key(a), set_key(b));
        self.table
            .get(&(ka.clone(), kb.clone()))
            .or_else(|| self.table.get(&(kb, ka)))
            .copied()
            .ok_or(SimilarityError::Missing)
    }

    fn range(&self) -> SimilarityRange {
        self.range
    }

    fn name(&self) -> &'static str {
        "precomputed"
    }
}

/// Canonical key for a skill list: normalized, de-duplicated, sorted.
pub fn set_key(skills: &[String]) -> String {
    let mut set = skill_set(skills);
    set.sort();
    set.join("\u{1f}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_range_mapping() {
        assert_eq!(SimilarityRange::Cosine.to_percent(0.8), Some(90.0));
        assert_eq!(SimilarityRange::Cosine.to_percent(-1.0), Some(0.0));
        assert_eq!(SimilarityRange::Unit.to_percent(0.25), Some(25.0));
        assert_eq!(SimilarityRange::Unit.to_percent(-0.1), None);
        assert_eq!(SimilarityRange::Cosine.to_percent(f64::NAN), None);
    }

    #[test]
    fn test_overlap_similarity() {
        let sim = OverlapSimilarity;
        let score = sim
            .similarity(&strings(&["Python", "SQL"]), &strings(&["python", "aws"]))
            .unwrap();
        assert!((score - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_precomputed_lookup_is_order_insensitive() {
        let mut table = PrecomputedSimilarity::new(SimilarityRange::Cosine);
        table.insert(&strings(&["sql", "python"]), &strings(&["aws"]), 0.4);

        let hit = table.similarity(&strings(&["Python", "SQL"]), &strings(&["AWS"]));
        assert_eq!(hit, Ok(0.4));

        // Reverse direction
        let reverse = table.similarity(&strings(&["aws"]), &strings(&["python", "sql"]));
        assert_eq!(reverse, Ok(0.4));

        let miss = table.similarity(&strings(&["go"]), &strings(&["aws"]));
        assert_eq!(miss, Err(SimilarityError::Missing));
    }
}
