//! Text-to-vector embedding collaborator (spec §6.4).
//!
//! Concrete vectorizers (Ollama, OpenAI, HuggingFace, local models) are out
//! of scope for this crate; callers implement this trait and hand an
//! `Arc<dyn Vectorizer>` to a collection at creation time.

use crate::error::Result;

/// Turns text into dense vectors for a collection configured with one.
pub trait Vectorizer: Send + Sync {
    /// Embeds a single piece of text into a `dim()`-length vector.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::EmbedFailed`] if embedding fails.
    fn generate(&self, text: &str) -> Result<Vec<f32>>;

    /// Embeds a batch of texts, in the same order as `texts`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::EmbedFailed`] if embedding fails. The
    /// default implementation embeds one at a time; implementors with a
    /// batched backend API should override this.
    fn generate_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.generate(t)).collect()
    }

    /// Output vector dimension this vectorizer produces.
    fn dim(&self) -> usize;

    /// Short identifier for this vectorizer's backend/model, for `info()`.
    fn kind(&self) -> &str;
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::Vectorizer;
    use crate::error::Result;

    /// Deterministic fake vectorizer for tests: hashes text into a vector
    /// of the configured dimension.
    pub(crate) struct HashVectorizer {
        pub dim: usize,
    }

    impl Vectorizer for HashVectorizer {
        fn generate(&self, text: &str) -> Result<Vec<f32>> {
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
}
