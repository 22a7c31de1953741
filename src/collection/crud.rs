//! Vector insert/get/delete operations (spec §4.11).

use super::types::Collection;
use crate::error::{Error, Result};
use crate::index::VectorIndex;
use crate::vector::{TextVector, Vector};

impl Collection {
    fn check_insertable(&self, values: &[f32], id: &str) -> Result<()> {
        if id.is_empty() {
            return Err(Error::EmptyId);
        }
        let dimensions = self.config.read().dimensions;
        if values.len() != dimensions {
            return Err(Error::DimMismatch {
                expected: dimensions,
                actual: values.len(),
            });
        }
        Ok(())
    }

    /// Inserts or upserts a single vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DimMismatch`] or [`Error::EmptyId`] on a malformed
    /// vector, or propagates the index's own `DuplicateId` when the
    /// collection's upsert policy disallows overwrite.
    pub fn insert(&self, vector: Vector) -> Result<()> {
        self.check_insertable(&vector.values, &vector.id)?;
        self.index.insert(&vector.id, &vector.values)?;
        self.vectors.write().insert(vector.id.clone(), vector);
        self.touch_modified();
        self.search_engine.invalidate_cache();
        Ok(())
    }

    /// Inserts a batch of vectors, all-or-nothing: every vector is
    /// validated before any is stored.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found; no vector in `vectors`
    /// is stored if any fails.
    pub fn insert_batch(&self, vectors: Vec<Vector>) -> Result<()> {
        for vector in &vectors {
            self.check_insertable(&vector.values, &vector.id)?;
        }
        for vector in vectors {
            self.index.insert(&vector.id, &vector.values)?;
            self.vectors.write().insert(vector.id.clone(), vector);
        }
        self.touch_modified();
        self.search_engine.invalidate_cache();
        Ok(())
    }

    /// Embeds `text` via the configured vectorizer, applies the content
    /// policy, and inserts the resulting vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoVectorizer`] if none is configured,
    /// [`Error::ContentTooLarge`] if the content policy rejects the text,
    /// or [`Error::EmbedFailed`] if embedding fails.
    pub fn insert_text(&self, text_vector: TextVector) -> Result<()> {
        let vectorizer = self.vectorizer.as_ref().ok_or(Error::NoVectorizer)?;
        let policy = self.config.read().content_policy.clone();
        policy.check_size(&text_vector.text)?;

        let values = vectorizer.generate(&text_vector.text)?;
        let mut metadata = text_vector.metadata;
        if policy.enabled {
            metadata.insert(
                policy.field_name.clone(),
                serde_json::Value::String(text_vector.text.clone()),
            );
        }
        self.insert(Vector::new(text_vector.id, values, metadata))
    }

    /// Embeds and inserts a batch of texts, all-or-nothing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoVectorizer`] if none is configured, or the first
    /// [`Error::ContentTooLarge`]/[`Error::EmbedFailed`] encountered; no
    /// text in `text_vectors` is stored if any fails.
    pub fn insert_text_batch(&self, text_vectors: Vec<TextVector>) -> Result<()> {
        let vectorizer = self.vectorizer.as_ref().ok_or(Error::NoVectorizer)?;
        let policy = self.config.read().content_policy.clone();
        for tv in &text_vectors {
            policy.check_size(&tv.text)?;
        }

        let texts: Vec<String> = text_vectors.iter().map(|tv| tv.text.clone()).collect();
        let embeddings = vectorizer.generate_batch(&texts)?;

        let mut vectors = Vec::with_capacity(text_vectors.len());
        for (tv, values) in text_vectors.into_iter().zip(embeddings) {
            let mut metadata = tv.metadata;
            if policy.enabled {
                metadata.insert(policy.field_name.clone(), serde_json::Value::String(tv.text));
            }
            vectors.push(Vector::new(tv.id, values, metadata));
        }
        self.insert_batch(vectors)
    }

    /// Fetches a copy of the stored vector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VectorNotFound`] if `id` is not present.
    pub fn get(&self, id: &str) -> Result<Vector> {
        self.vectors
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| Error::VectorNotFound(id.to_string()))
    }

    /// Removes a vector from the index and vector set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::VectorNotFound`] if `id` is not present.
    pub fn delete(&self, id: &str) -> Result<()> {
        if self.vectors.write().remove(id).is_none() {
            return Err(Error::VectorNotFound(id.to_string()));
        }
        self.index.delete(id)?;
        self.touch_modified();
        self.search_engine.invalidate_cache();
        Ok(())
    }
}
