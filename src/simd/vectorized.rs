//! Vectorized execution mode: 8-wide unrolled loops using the `wide` crate's
//! portable SIMD type. `wide` selects the best lane width for the host
//! platform at compile time, so no CPU-feature detection is needed here.

use wide::f32x8;

/// Computes cosine similarity between two equal-length slices using 8-wide
/// unrolled accumulation for the dot product and both norms.
#[must_use]
pub fn cosine_vectorized(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let len = a.len();
    let chunks = len / 8;
    let mut dot_acc = f32x8::ZERO;
    let mut norm_a_acc = f32x8::ZERO;
    let mut norm_b_acc = f32x8::ZERO;

    for i in 0..chunks {
        let off = i * 8;
        let va = f32x8::from(&a[off..off + 8]);
        let vb = f32x8::from(&b[off..off + 8]);
        dot_acc = va.mul_add(vb, dot_acc);
        norm_a_acc = va.mul_add(va, norm_a_acc);
        norm_b_acc = vb.mul_add(vb, norm_b_acc);
    }

    let mut dot = dot_acc.reduce_add();
    let mut norm_a = norm_a_acc.reduce_add();
    let mut norm_b = norm_b_acc.reduce_add();

    for i in (chunks * 8)..len {
        dot += a[i] * b[i];
        norm_a += a[i] * a[i];
        norm_b += b[i] * b[i];
    }

    let norm_a = norm_a.sqrt();
    let norm_b = norm_b.sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Computes cosine similarity of `query` against every row of `vectors`
/// using [`cosine_vectorized`] per row.
#[must_use]
pub fn cosine_batch_vectorized(query: &[f32], vectors: &[&[f32]]) -> Vec<f32> {
    vectors
        .iter()
        .map(|v| {
            if v.len() != query.len() {
                0.0
            } else {
                cosine_vectorized(query, v)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::cosine;

    #[test]
    fn matches_scalar_on_non_multiple_of_8() {
        let a = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        let b = vec![5.0, 4.0, 3.0, 2.0, 1.0];
        assert!((cosine_vectorized(&a, &b) - cosine(&a, &b)).abs() < 1e-5);
    }

    #[test]
    fn matches_scalar_on_exact_multiple_of_8() {
        let a: Vec<f32> = (0..16).map(|i| i as f32).collect();
        let b: Vec<f32> = (0..16).map(|i| (16 - i) as f32).collect();
        assert!((cosine_vectorized(&a, &b) - cosine(&a, &b)).abs() < 1e-5);
    }
}
