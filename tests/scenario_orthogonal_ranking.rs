//! Scenario 1 (spec §8): ranking and scoring over orthogonal unit vectors.

use vittoriadb_core::collection::ContentPolicy;
use vittoriadb_core::config::{HnswConfig, SearchConfig};
use vittoriadb_core::index::IndexKind;
use vittoriadb_core::vector::{IncludeFlags, SearchRequest, Vector};
use vittoriadb_core::{Collection, DistanceMetric};

fn collection() -> Collection {
    let dir = tempfile::tempdir().unwrap();
    Collection::create(
        dir.path(),
        "orthogonal",
        4,
        DistanceMetric::Cosine,
        IndexKind::Flat,
        ContentPolicy::default(),
        false,
        &HnswConfig::default(),
        &SearchConfig::default(),
        None,
    )
    .unwrap()
}

#[test]
fn orthogonal_unit_vectors_rank_by_cosine_similarity() {
    let col = collection();
    col.insert(Vector::without_metadata("a", vec![1.0, 0.0, 0.0, 0.0])).unwrap();
    col.insert(Vector::without_metadata("b", vec![0.0, 1.0, 0.0, 0.0])).unwrap();
    col.insert(Vector::without_metadata("c", vec![0.0, 0.0, 1.0, 0.0])).unwrap();
    col.insert(Vector::without_metadata("d", vec![0.0, 0.0, 0.0, 1.0])).unwrap();

    let request = SearchRequest {
        vector: vec![0.9, 0.1, 0.0, 0.0],
        limit: 3,
        offset: 0,
        filter: None,
        include: IncludeFlags::default(),
    };
    let response = col.search(&request).unwrap();

    assert_eq!(response.results.len(), 3);
    assert_eq!(response.results[0].id, "a");
    assert!((response.results[0].score - 0.9939).abs() < 1e-3);
    assert_eq!(response.results[1].id, "b");
    assert!((response.results[1].score - 0.1104).abs() < 1e-3);
    // c and d tie at score 0; ties break by ascending id.
    assert_eq!(response.results[2].id, "c");
    assert!((response.results[2].score).abs() < 1e-6);
}
