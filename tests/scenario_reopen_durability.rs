//! Scenario 2 (spec §8): insert, flush, close, reopen, verify count and
//! self-search rank-1 score.

use vittoriadb_core::collection::ContentPolicy;
use vittoriadb_core::config::{HnswConfig, SearchConfig};
use vittoriadb_core::index::IndexKind;
use vittoriadb_core::vector::{IncludeFlags, SearchRequest, Vector};
use vittoriadb_core::{Collection, DistanceMetric};

fn unit_vector(dim: usize, seed: u64) -> Vec<f32> {
    let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
    let mut next = move || {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        ((state >> 40) as f32 / (1u32 << 24) as f32) - 1.0
    };
    let raw: Vec<f32> = (0..dim).map(|_| next()).collect();
    let norm: f32 = raw.iter().map(|x| x * x).sum::<f32>().sqrt().max(1e-6);
    raw.into_iter().map(|x| x / norm).collect()
}

#[test]
fn reopen_after_flush_preserves_count_and_self_search() {
    let dir = tempfile::tempdir().unwrap();
    let dim = 384;

    {
        let col = Collection::create(
            dir.path(),
            "docs",
            dim,
            DistanceMetric::Cosine,
            IndexKind::Flat,
            ContentPolicy::default(),
            false,
            &HnswConfig::default(),
            &SearchConfig::default(),
            None,
        )
        .unwrap();

        for i in 0..1000 {
            col.insert(Vector::without_metadata(format!("v{i}"), unit_vector(dim, i)))
                .unwrap();
        }
        col.flush().unwrap();
        col.close().unwrap();
    }

    let reopened = Collection::open(
        dir.path(),
        "docs",
        &HnswConfig::default(),
        &SearchConfig::default(),
        None,
    )
    .unwrap();
    assert_eq!(reopened.count(), 1000);

    for i in [0usize, 500, 999] {
        let id = format!("v{i}");
        let values = reopened.get(&id).unwrap().values;
        let request = SearchRequest {
            vector: values,
            limit: 1,
            offset: 0,
            filter: None,
            include: IncludeFlags::default(),
        };
        let response = reopened.search(&request).unwrap();
        assert_eq!(response.results[0].id, id);
        assert!(response.results[0].score >= 0.9999);
    }
}
