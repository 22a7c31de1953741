//! Vector and search-result data structures.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A stored vector with its metadata.
///
/// Created by `insert`; never mutated in place — updates are a delete plus
/// re-insert at the collection layer. Content, when the collection's
/// content policy is enabled, is stashed under a reserved metadata key
/// rather than a separate field (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vector {
    /// Unique, non-empty id within the owning collection.
    pub id: String,
    /// Dense float values; length must equal the collection's dimension.
    pub values: Vec<f32>,
    /// Arbitrary JSON metadata attached to the vector.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Vector {
    /// Creates a new vector with the given id, values, and metadata.
    #[must_use]
    pub fn new(id: impl Into<String>, values: Vec<f32>, metadata: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            values,
            metadata,
        }
    }

    /// Creates a vector with no metadata.
    #[must_use]
    pub fn without_metadata(id: impl Into<String>, values: Vec<f32>) -> Self {
        Self::new(id, values, Map::new())
    }

    /// Dimension of this vector's values.
    #[must_use]
    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// A text input transformed into a [`Vector`] via a collection's configured
/// vectorizer (spec §3, §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextVector {
    /// Unique, non-empty id within the owning collection.
    pub id: String,
    /// Raw text to embed.
    pub text: String,
    /// Additional metadata merged with the content-policy field, if any.
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl TextVector {
    /// Creates a new text vector input.
    #[must_use]
    pub fn new(id: impl Into<String>, text: impl Into<String>, metadata: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            metadata,
        }
    }
}

/// A single ranked search result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Id of the matching vector.
    pub id: String,
    /// Similarity score; higher is always more similar (spec §4.1 mapping).
    pub score: f32,
    /// Present iff the request set `include_vector`.
    pub vector: Option<Vec<f32>>,
    /// Present iff the request set `include_metadata`.
    pub metadata: Option<Map<String, Value>>,
    /// Present iff `include_content` was set and the collection's content
    /// policy is enabled and the content field holds a string value.
    pub content: Option<String>,
}

/// Which optional fields a search response should populate.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct IncludeFlags {
    /// Populate [`SearchResult::vector`].
    pub vector: bool,
    /// Populate [`SearchResult::metadata`].
    pub metadata: bool,
    /// Populate [`SearchResult::content`].
    pub content: bool,
}

/// A search request against a collection (spec §4.11 `search`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Query vector; length must equal the collection's dimension.
    pub vector: Vec<f32>,
    /// Maximum number of results to return; must be > 0.
    pub limit: usize,
    /// Number of top results to skip before returning `limit` more.
    #[serde(default)]
    pub offset: usize,
    /// Optional metadata filter tree.
    #[serde(default)]
    pub filter: Option<crate::filter::Filter>,
    /// Which optional fields to populate on each result.
    #[serde(default)]
    pub include: IncludeFlags,
}

/// The response to a [`SearchRequest`] (spec §4.11 `search`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Ranked results, `len() <= request.limit`.
    pub results: Vec<SearchResult>,
    /// Number of candidates that survived filtering, before `limit`/`offset`.
    pub total_candidates_after_filter: usize,
    /// Wall-clock time spent serving the request, in milliseconds.
    pub took_ms: f64,
    /// Opaque id identifying this request for logging/tracing correlation.
    pub request_id: String,
}
