//! Distance metrics for vector similarity calculations.
//!
//! Scalar reference implementations live here; [`crate::simd`] provides
//! vectorized and parallel variants that must agree with these to within
//! 1e-3 relative error (see the SIMD-equivalence tests in that module).

use serde::{Deserialize, Serialize};

/// Distance metric used by a collection for scoring and ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity: `dot(a,b) / (|a| |b|)`, 0 if either vector is zero.
    Cosine,
    /// Euclidean (L2) distance.
    Euclidean,
    /// Dot product (inner product).
    Dot,
    /// Manhattan (L1) distance.
    Manhattan,
}

impl DistanceMetric {
    /// Wire value used by the on-disk/wire enumeration (spec §6.5).
    #[must_use]
    pub const fn wire_value(self) -> u8 {
        match self {
            Self::Cosine => 0,
            Self::Euclidean => 1,
            Self::Dot => 2,
            Self::Manhattan => 3,
        }
    }

    /// Parses a wire value back into a metric.
    #[must_use]
    pub const fn from_wire_value(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Cosine),
            1 => Some(Self::Euclidean),
            2 => Some(Self::Dot),
            3 => Some(Self::Manhattan),
            _ => None,
        }
    }

    /// Returns whether a higher raw distance value means "more similar".
    #[must_use]
    pub const fn higher_is_better(self) -> bool {
        matches!(self, Self::Cosine | Self::Dot)
    }

    /// Computes the raw distance/similarity value for this metric.
    ///
    /// # Panics
    ///
    /// Panics if `a.len() != b.len()`.
    #[must_use]
    pub fn calculate(self, a: &[f32], b: &[f32]) -> f32 {
        assert_eq!(a.len(), b.len(), "vector dimensions must match");
        match self {
            Self::Cosine => cosine(a, b),
            Self::Euclidean => euclidean(a, b),
            Self::Dot => dot(a, b),
            Self::Manhattan => manhattan(a, b),
        }
    }

    /// Maps a raw distance/similarity into a score where higher is always
    /// more similar, per spec §4.1: cosine/dot are returned as-is; for
    /// euclidean/manhattan we return `1 / (1 + distance)`.
    #[must_use]
    pub fn to_score(self, raw: f32) -> f32 {
        if self.higher_is_better() {
            raw
        } else {
            1.0 / (1.0 + raw)
        }
    }
}

/// Cosine similarity. Returns 0.0 if either vector has zero norm.
#[must_use]
pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Euclidean (L2) distance.
#[must_use]
pub fn euclidean(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}

/// Dot product.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Manhattan (L1) distance.
#[must_use]
pub fn manhattan(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
}

/// Computes cosine similarity of `query` against every vector in `vectors`.
///
/// Pre-normalizes the query norm once. Vectors whose dimension does not
/// match the query score 0 instead of panicking, so a batch can mix
/// shapes defensively; the result length always equals `vectors.len()`.
#[must_use]
pub fn cosine_batch(query: &[f32], vectors: &[&[f32]]) -> Vec<f32> {
    let norm_q: f32 = query.iter().map(|x| x * x).sum::<f32>().sqrt();
    vectors
        .iter()
        .map(|v| {
            if v.len() != query.len() || norm_q == 0.0 {
                return 0.0;
            }
            let dot: f32 = query.iter().zip(*v).map(|(x, y)| x * y).sum();
            let norm_v: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm_v == 0.0 {
                0.0
            } else {
                dot / (norm_q * norm_v)
            }
        })
        .collect()
}

/// Normalizes a vector to unit length in place. No-op if the norm is zero.
pub fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for x in v.iter_mut() {
        *x /= norm;
    }
}

/// Normalizes every vector in `vs` in place.
pub fn normalize_batch(vs: &mut [Vec<f32>]) {
    for v in vs.iter_mut() {
        normalize(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_identical_vectors() {
        let a = [1.0, 0.0, 0.0];
        assert!((cosine(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_orthogonal_vectors() {
        let a = [1.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0];
        assert!(cosine(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn cosine_zero_vector_is_zero() {
        let a = [0.0, 0.0, 0.0];
        let b = [1.0, 2.0, 3.0];
        assert_eq!(cosine(&a, &b), 0.0);
    }

    #[test]
    fn euclidean_3_4_5_triangle() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert!((euclidean(&a, &b) - 5.0).abs() < 1e-6);
    }

    #[test]
    fn manhattan_basic() {
        let a = [0.0, 0.0];
        let b = [3.0, 4.0];
        assert!((manhattan(&a, &b) - 7.0).abs() < 1e-6);
    }

    #[test]
    fn dot_basic() {
        let a = [1.0, 2.0, 3.0];
        let b = [4.0, 5.0, 6.0];
        assert!((dot(&a, &b) - 32.0).abs() < 1e-6);
    }

    #[test]
    fn scenario_orthogonal_unit_vectors_scoring() {
        // Scenario 1 from spec §8: query [0.9,0.1,0,0] against the basis vectors.
        let query = [0.9, 0.1, 0.0, 0.0];
        let a = [1.0, 0.0, 0.0, 0.0];
        let b = [0.0, 1.0, 0.0, 0.0];
        let c = [0.0, 0.0, 1.0, 0.0];

        let score_a = DistanceMetric::Cosine.calculate(&query, &a);
        let score_b = DistanceMetric::Cosine.calculate(&query, &b);
        let score_c = DistanceMetric::Cosine.calculate(&query, &c);

        assert!((score_a - 0.9939).abs() < 1e-3);
        assert!((score_b - 0.1104).abs() < 1e-3);
        assert_eq!(score_c, 0.0);
        assert!(score_a > score_b && score_b > score_c);
    }

    #[test]
    fn cosine_batch_matches_per_vector_cosine() {
        let query = [0.9, 0.1, 0.0, 0.0];
        let vectors: Vec<Vec<f32>> = vec![
            vec![1.0, 0.0, 0.0, 0.0],
            vec![0.0, 1.0, 0.0, 0.0],
            vec![0.0, 0.0, 1.0, 0.0],
        ];
        let refs: Vec<&[f32]> = vectors.iter().map(|v| v.as_slice()).collect();
        let batch = cosine_batch(&query, &refs);
        assert_eq!(batch.len(), 3);
        for (v, &s) in vectors.iter().zip(batch.iter()) {
            assert!((s - cosine(&query, v)).abs() < 1e-6);
        }
    }

    #[test]
    fn normalize_unit_length() {
        let mut v = vec![3.0, 4.0];
        normalize(&mut v);
        let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_zero_vector_is_noop() {
        let mut v = vec![0.0, 0.0];
        normalize(&mut v);
        assert_eq!(v, vec![0.0, 0.0]);
    }
}
