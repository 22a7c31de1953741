//! Metadata filter expressions for search (spec §6.3).
//!
//! A [`Filter`] wraps a recursive [`Condition`] tree: leaf nodes test a
//! single field, inner nodes combine child conditions with `and`/`or`/`not`.

mod builders;
mod matching;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A metadata filter, evaluated against a vector's JSON metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Filter {
    /// Root condition of the filter tree.
    pub condition: Condition,
}

impl Filter {
    /// Wraps a condition as a filter.
    #[must_use]
    pub fn new(condition: Condition) -> Self {
        Self { condition }
    }

    /// Evaluates the filter against a metadata object.
    #[must_use]
    pub fn matches(&self, metadata: &Value) -> bool {
        self.condition.matches(metadata)
    }
}

/// A node in a filter expression tree (spec §6.3).
///
/// Leaf variants test `field` against `value`/`values`; `And`/`Or`/`Not`
/// combine child conditions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Condition {
    /// `field == value`.
    Eq {
        /// Field name, dot-notation supported for nested objects.
        field: String,
        /// Value to compare against.
        value: Value,
    },
    /// `field != value`.
    Ne {
        /// Field name.
        field: String,
        /// Value to compare against.
        value: Value,
    },
    /// `field > value` (numeric or string comparison).
    Gt {
        /// Field name.
        field: String,
        /// Value to compare against.
        value: Value,
    },
    /// `field >= value`.
    Gte {
        /// Field name.
        field: String,
        /// Value to compare against.
        value: Value,
    },
    /// `field < value`.
    Lt {
        /// Field name.
        field: String,
        /// Value to compare against.
        value: Value,
    },
    /// `field <= value`.
    Lte {
        /// Field name.
        field: String,
        /// Value to compare against.
        value: Value,
    },
    /// `field` is one of `values`.
    In {
        /// Field name.
        field: String,
        /// Candidate values.
        values: Vec<Value>,
    },
    /// `field` is none of `values`.
    NotIn {
        /// Field name.
        field: String,
        /// Excluded values.
        values: Vec<Value>,
    },
    /// `field` (a string or array) contains `value`.
    Contains {
        /// Field name.
        field: String,
        /// Value to search for.
        value: Value,
    },
    /// `field` is present in the metadata, regardless of its value.
    Exists {
        /// Field name.
        field: String,
    },
    /// All child conditions must match.
    And {
        /// Child conditions.
        conditions: Vec<Condition>,
    },
    /// At least one child condition must match.
    Or {
        /// Child conditions.
        conditions: Vec<Condition>,
    },
    /// The child condition must not match.
    Not {
        /// Negated condition.
        condition: Box<Condition>,
    },
}
