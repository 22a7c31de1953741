//! Scenario 3 (spec §8): content-policy size limit and round-trip via
//! `search_text`.

use std::sync::Arc;
use vittoriadb_core::collection::ContentPolicy;
use vittoriadb_core::config::{HnswConfig, SearchConfig};
use vittoriadb_core::error::Error;
use vittoriadb_core::index::IndexKind;
use vittoriadb_core::vector::TextVector;
use vittoriadb_core::vectorizer::Vectorizer;
use vittoriadb_core::{Collection, DistanceMetric};

/// Deterministic fake: hashes bytes into a fixed-dimension vector.
struct HashVectorizer {
    dim: usize,
}

impl Vectorizer for HashVectorizer {
    fn generate(&self, text: &str) -> vittoriadb_core::Result<Vec<f32>> {
        let mut values = vec![0.0f32; self.dim];
        for (i, byte) in text.bytes().enumerate() {
            values[i % self.dim] += f32::from(byte);
        }
        Ok(values)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn kind(&self) -> &str {
        "hash-test-vectorizer"
    }
}

fn collection() -> Collection {
    let dir = tempfile::tempdir().unwrap();
    Collection::create(
        dir.path(),
        "docs",
        8,
        DistanceMetric::Cosine,
        IndexKind::Flat,
        ContentPolicy {
            enabled: true,
            field_name: "_content".to_string(),
            max_size_bytes: 1_048_576,
            compressed: false,
        },
        false,
        &HnswConfig::default(),
        &SearchConfig::default(),
        Some(Arc::new(HashVectorizer { dim: 8 })),
    )
    .unwrap()
}

#[test]
fn content_over_limit_is_rejected() {
    let col = collection();
    let text = "x".repeat(1_048_577);
    let result = col.insert_text(TextVector::new("a", text, serde_json::Map::new()));
    assert!(matches!(result, Err(Error::ContentTooLarge { .. })));
}

#[test]
fn content_at_limit_round_trips_through_search_text() {
    let col = collection();
    let text = "y".repeat(1_048_576);
    col.insert_text(TextVector::new("a", text.clone(), serde_json::Map::new()))
        .unwrap();

    let response = col.search_text(&text, 1, None).unwrap();
    assert_eq!(response.results[0].id, "a");
    assert_eq!(response.results[0].content, None); // include.content defaults to false

    let request = vittoriadb_core::vector::SearchRequest {
        vector: col.get("a").unwrap().values,
        limit: 1,
        offset: 0,
        filter: None,
        include: vittoriadb_core::vector::IncludeFlags {
            vector: false,
            metadata: false,
            content: true,
        },
    };
    let response = col.search(&request).unwrap();
    assert_eq!(response.results[0].id, "a");
    assert_eq!(response.results[0].content.as_deref(), Some(text.as_str()));
}
