//! Original-content storage policy for text-derived vectors (spec §3).

use serde::{Deserialize, Serialize};

/// Governs whether and how raw text is retained alongside its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentPolicy {
    /// Whether text is stashed under `field_name` at all.
    pub enabled: bool,
    /// Metadata key the content is stored under.
    pub field_name: String,
    /// Maximum content size in bytes; 0 means unlimited.
    pub max_size_bytes: usize,
    /// Reserved for a future compressed-storage variant; not yet applied.
    pub compressed: bool,
}

impl Default for ContentPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            field_name: "_content".to_string(),
            max_size_bytes: 1_048_576,
            compressed: false,
        }
    }
}

impl ContentPolicy {
    /// Checks `text` against `max_size_bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::ContentTooLarge`] if the policy is
    /// enabled, `max_size_bytes > 0`, and `text` exceeds it.
    pub fn check_size(&self, text: &str) -> crate::error::Result<()> {
        if self.enabled && self.max_size_bytes > 0 && text.len() > self.max_size_bytes {
            return Err(crate::error::Error::ContentTooLarge {
                size: text.len(),
                limit: self.max_size_bytes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_policy_never_rejects() {
        let policy = ContentPolicy {
            enabled: false,
            ..ContentPolicy::default()
        };
        assert!(policy.check_size(&"x".repeat(10_000_000)).is_ok());
    }

    #[test]
    fn zero_max_size_means_unlimited() {
        let policy = ContentPolicy {
            enabled: true,
            max_size_bytes: 0,
            ..ContentPolicy::default()
        };
        assert!(policy.check_size(&"x".repeat(10_000_000)).is_ok());
    }

    #[test]
    fn rejects_content_over_limit() {
        let policy = ContentPolicy {
            enabled: true,
            max_size_bytes: 5,
            ..ContentPolicy::default()
        };
        assert!(policy.check_size("123456").is_err());
        assert!(policy.check_size("12345").is_ok());
    }
}
