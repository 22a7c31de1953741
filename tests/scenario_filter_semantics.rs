//! Scenario 6 (spec §8): metadata filter semantics through a real search.

use serde_json::json;
use vittoriadb_core::collection::ContentPolicy;
use vittoriadb_core::config::{HnswConfig, SearchConfig};
use vittoriadb_core::filter::{Condition, Filter};
use vittoriadb_core::index::IndexKind;
use vittoriadb_core::vector::{IncludeFlags, SearchRequest, Vector};
use vittoriadb_core::{Collection, DistanceMetric};

fn collection() -> Collection {
    let dir = tempfile::tempdir().unwrap();
    Collection::create(
        dir.path(),
        "docs",
        2,
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

fn search(col: &Collection, filter: Filter) -> Vec<String> {
    let request = SearchRequest {
        vector: vec![1.0, 0.0],
        limit: 10,
        offset: 0,
        filter: Some(filter),
        include: IncludeFlags::default(),
    };
    col.search(&request)
        .unwrap()
        .results
        .into_iter()
        .map(|r| r.id)
        .collect()
}

#[test]
fn and_of_eq_and_gte_matches_tech_2024() {
    let col = collection();
    col.insert(Vector::new(
        "a",
        vec![1.0, 0.0],
        serde_json::Map::from_iter([
            ("category".to_string(), json!("tech")),
            ("year".to_string(), json!(2024)),
        ]),
    ))
    .unwrap();
    col.insert(Vector::new(
        "b",
        vec![1.0, 0.0],
        serde_json::Map::from_iter([
            ("category".to_string(), json!("sports")),
            ("year".to_string(), json!(2024)),
        ]),
    ))
    .unwrap();

    let filter = Filter::new(Condition::And {
        conditions: vec![
            Condition::Eq {
                field: "category".to_string(),
                value: json!("tech"),
            },
            Condition::Gte {
                field: "year".to_string(),
                value: json!(2023),
            },
        ],
    });

    let ids = search(&col, filter);
    assert_eq!(ids, vec!["a".to_string()]);
}

#[test]
fn not_exists_matches_vectors_missing_the_field() {
    let col = collection();
    col.insert(Vector::new(
        "has-author",
        vec![1.0, 0.0],
        serde_json::Map::from_iter([("author".to_string(), json!("ada"))]),
    ))
    .unwrap();
    col.insert(Vector::without_metadata("no-author", vec![1.0, 0.0])).unwrap();

    let filter = Filter::new(Condition::Not {
        condition: Box::new(Condition::Exists {
            field: "author".to_string(),
        }),
    });

    let ids = search(&col, filter);
    assert_eq!(ids, vec!["no-author".to_string()]);
}
