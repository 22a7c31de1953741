//! Vector and text search operations (spec §4.11 `search`/`search_text`).

use super::types::Collection;
use crate::error::{Error, Result};
use crate::filter::Filter;
use crate::index::VectorIndex;
use crate::search::CandidateSource;
use crate::vector::{IncludeFlags, SearchRequest, SearchResponse};
use serde_json::{Map, Value};

impl CandidateSource for Collection {
    fn index(&self) -> &dyn VectorIndex {
        self.index.as_ref()
    }

    fn metadata(&self, id: &str) -> Option<Map<String, Value>> {
        self.vectors.read().get(id).map(|v| v.metadata.clone())
    }

    fn vector(&self, id: &str) -> Option<Vec<f32>> {
        self.vectors.read().get(id).map(|v| v.values.clone())
    }

    fn content(&self, id: &str) -> Option<String> {
        let config = self.config.read();
        if !config.content_policy.enabled {
            return None;
        }
        let field = config.content_policy.field_name.clone();
        drop(config);
        self.vectors
            .read()
            .get(id)
            .and_then(|v| v.metadata.get(&field))
            .and_then(Value::as_str)
            .map(str::to_string)
    }
}

impl Collection {
    /// Runs a nearest-neighbor search against the collection's index.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimMismatch`] if `request.vector`'s length does not
    /// match the collection's dimension, or [`Error::InvalidLimit`] if
    /// `request.limit == 0`.
    pub fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let config = self.config.read();
        let dimensions = config.dimensions;
        let metric = config.metric;
        let name = config.name.clone();
        drop(config);

        if request.vector.len() != dimensions {
            return Err(Error::DimMismatch {
                expected: dimensions,
                actual: request.vector.len(),
            });
        }
        if request.limit == 0 {
            return Err(Error::InvalidLimit(request.limit));
        }

        self.search_engine.search(&name, self, metric, request)
    }

    /// Embeds `query` via the configured vectorizer and runs [`Collection::search`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoVectorizer`] if none is configured, or propagates
    /// [`Collection::search`]'s errors.
    pub fn search_text(&self, query: &str, limit: usize, filter: Option<Filter>) -> Result<SearchResponse> {
        let vectorizer = self.vectorizer.as_ref().ok_or(Error::NoVectorizer)?;
        let vector = vectorizer.generate(query)?;
        self.search(&SearchRequest {
            vector,
            limit,
            offset: 0,
            filter,
            include: IncludeFlags::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HnswConfig, SearchConfig};
    use crate::distance::DistanceMetric;
    use crate::filter::Condition;
    use crate::index::IndexKind;
    use crate::vector::Vector;
    use serde_json::json;

    fn collection() -> Collection {
        let dir = tempfile::tempdir().unwrap();
        Collection::create(
            dir.path(),
            "docs",
            3,
            DistanceMetric::Cosine,
            IndexKind::Flat,
            super::super::ContentPolicy::default(),
            false,
            &HnswConfig::default(),
            &SearchConfig::default(),
            None,
        )
        .unwrap()
    }

    #[test]
    fn search_rejects_dimension_mismatch() {
        let col = collection();
        let request = SearchRequest {
            vector: vec![1.0, 0.0],
            limit: 1,
            offset: 0,
            filter: None,
            include: IncludeFlags::default(),
        };
        assert!(matches!(col.search(&request), Err(Error::DimMismatch { .. })));
    }

    #[test]
    fn search_rejects_zero_limit() {
        let col = collection();
        let request = SearchRequest {
            vector: vec![1.0, 0.0, 0.0],
            limit: 0,
            offset: 0,
            filter: None,
            include: IncludeFlags::default(),
        };
        assert!(matches!(col.search(&request), Err(Error::InvalidLimit(0))));
    }

    #[test]
    fn search_returns_inserted_vector_as_top_hit() {
        let col = collection();
        col.insert(Vector::without_metadata("a", vec![1.0, 0.0, 0.0])).unwrap();
        col.insert(Vector::without_metadata("b", vec![0.0, 1.0, 0.0])).unwrap();

        let request = SearchRequest {
            vector: vec![1.0, 0.0, 0.0],
            limit: 1,
            offset: 0,
            filter: None,
            include: IncludeFlags {
                vector: true,
                metadata: true,
                content: false,
            },
        };
        let response = col.search(&request).unwrap();
        assert_eq!(response.results[0].id, "a");
        assert_eq!(response.results[0].vector, Some(vec![1.0, 0.0, 0.0]));
    }

    #[test]
    fn search_honors_metadata_filter() {
        let col = collection();
        col.insert(Vector::new(
            "a",
            vec![1.0, 0.0, 0.0],
            serde_json::Map::from_iter([("kind".to_string(), json!("keep"))]),
        ))
        .unwrap();
        col.insert(Vector::without_metadata("b", vec![1.0, 0.0, 0.0])).unwrap();

        let request = SearchRequest {
            vector: vec![1.0, 0.0, 0.0],
            limit: 10,
            offset: 0,
            filter: Some(Filter::new(Condition::Eq {
                field: "kind".to_string(),
                value: json!("keep"),
            })),
            include: IncludeFlags::default(),
        };
        let response = col.search(&request).unwrap();
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.results[0].id, "a");
    }

    #[test]
    fn search_text_without_vectorizer_errors() {
        let col = collection();
        assert!(matches!(col.search_text("hello", 1, None), Err(Error::NoVectorizer)));
    }
}
