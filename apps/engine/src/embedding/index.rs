//! Pure similarity math over L2-normalized vectors.
//!
//! The index holds no CV-domain state: candidate vectors are rebuilt per call
//! from the current candidate set, which is bounded by one profile's entry
//! count. Embeddings are normalized once at creation so search is a plain
//! inner product.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{EmbeddingBackend, EmbeddingError};

/// Result of a similarity query against a candidate list.
///
/// "No match" is represented by absence, never by a zero-score match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityMatch {
    pub index: usize,
    pub score: f32,
}

/// Normalizes text for comparison: trim, collapse internal whitespace,
/// lowercase.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Scales a vector to unit length in place. Zero vectors are left untouched.
pub fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > f32::EPSILON {
        for x in vector.iter_mut() {
            *x /= norm;
        }
    }
}

/// Returns the highest-scoring candidate at or above `threshold`.
///
/// Vectors must already be L2-normalized. Candidates with a mismatched
/// dimension are skipped. Threshold enforcement stays with the caller's
/// choice of cutoff: different fragment kinds need different thresholds.
pub fn nearest(query: &[f32], candidates: &[Vec<f32>], threshold: f32) -> Option<SimilarityMatch> {
    let mut best: Option<SimilarityMatch> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        if candidate.len() != query.len() || candidate.is_empty() {
            continue;
        }
        let score: f32 = query.iter().zip(candidate.iter()).map(|(a, b)| a * b).sum();
        if best.map_or(true, |b| score > b.score) {
            best = Some(SimilarityMatch { index, score });
        }
    }
    best.filter(|m| m.score >= threshold)
}

/// Finds the nearest previously-seen text above a caller-supplied threshold.
#[derive(Clone)]
pub struct SimilarityIndex {
    backend: Arc<dyn EmbeddingBackend>,
}

impl SimilarityIndex {
    pub fn new(backend: Arc<dyn EmbeddingBackend>) -> Self {
        Self { backend }
    }

    /// Embeds the query and candidates in one backend call and returns the
    /// best candidate at or above `threshold`.
    ///
    /// Empty or whitespace-only texts embed to nothing and never match. The
    /// returned index refers to the original candidate slice.
    pub async fn best_match(
        &self,
        query: &str,
        candidates: &[String],
        threshold: f32,
    ) -> Result<Option<SimilarityMatch>, EmbeddingError> {
        let query_norm = normalize_text(query);
        if query_norm.is_empty() || candidates.is_empty() {
            return Ok(None);
        }

        let mut texts = vec![query_norm];
        let mut positions = Vec::new();
        for (i, candidate) in candidates.iter().enumerate() {
            let normalized = normalize_text(candidate);
            if normalized.is_empty() {
                continue;
            }
            positions.push(i);
            texts.push(normalized);
        }
        if positions.is_empty() {
            return Ok(None);
        }

        let mut vectors = self.backend.embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::ShapeMismatch {
                expected: texts.len(),
                got: vectors.len(),
            });
        }
        for vector in &mut vectors {
            l2_normalize(vector);
        }

        let query_vector = &vectors[0];
        Ok(nearest(query_vector, &vectors[1..], threshold).map(|m| SimilarityMatch {
            index: positions[m.index],
            score: m.score,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::StubEmbedder;
    use super::*;

    #[test]
    fn test_normalize_text_trims_collapses_and_lowercases() {
        assert_eq!(normalize_text("  Software   Engineer \n"), "software engineer");
        assert_eq!(normalize_text("\t \n"), "");
    }

    #[test]
    fn test_l2_normalize_produces_unit_length() {
        let mut v = vec![3.0, 4.0];
        l2_normalize(&mut v);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_l2_normalize_leaves_zero_vector() {
        let mut v = vec![0.0, 0.0];
        l2_normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }

    #[test]
    fn test_nearest_picks_highest_scoring_candidate() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.0, 1.0], vec![0.9, 0.43589], vec![0.6, 0.8]];
        let m = nearest(&query, &candidates, 0.5).unwrap();
        assert_eq!(m.index, 1);
        assert!((m.score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_nearest_below_threshold_is_no_match() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![0.6, 0.8]];
        assert!(nearest(&query, &candidates, 0.85).is_none());
    }

    #[test]
    fn test_nearest_skips_mismatched_dimensions() {
        let query = vec![1.0, 0.0];
        let candidates = vec![vec![1.0], vec![1.0, 0.0]];
        let m = nearest(&query, &candidates, 0.5).unwrap();
        assert_eq!(m.index, 1);
    }

    #[tokio::test]
    async fn test_best_match_identical_text_scores_one() {
        let index = SimilarityIndex::new(std::sync::Arc::new(StubEmbedder::new()));
        let m = index
            .best_match("Rust", &["rust".to_string()], 0.9)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(m.index, 0);
        assert!((m.score - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_best_match_empty_query_never_matches() {
        let index = SimilarityIndex::new(std::sync::Arc::new(StubEmbedder::new()));
        let m = index
            .best_match("   ", &["rust".to_string()], 0.0)
            .await
            .unwrap();
        assert!(m.is_none());
    }

    #[tokio::test]
    async fn test_best_match_preserves_original_candidate_index() {
        // The empty candidate at index 0 is excluded from the embed call but
        // the reported index still refers to the original slice.
        let index = SimilarityIndex::new(std::sync::Arc::new(StubEmbedder::new()));
        let candidates = vec!["  ".to_string(), "go".to_string(), "rust".to_string()];
        let m = index
            .best_match("rust", &candidates, 0.9)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(m.index, 2);
    }
}
