//! Scalar (non-unrolled) execution mode for batch cosine similarity.

use crate::distance::cosine;

/// Computes cosine similarity of `query` against every row of `vectors`
/// using a plain per-element scalar loop.
#[must_use]
pub fn cosine_batch_scalar(query: &[f32], vectors: &[&[f32]]) -> Vec<f32> {
    vectors
        .iter()
        .map(|v| {
            if v.len() != query.len() {
                0.0
            } else {
                cosine(query, v)
            }
        })
        .collect()
}
