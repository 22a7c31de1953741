//! Condition evaluation against a JSON metadata object.

use super::Condition;
use serde_json::Value;

impl Condition {
    /// Evaluates this condition against a vector's metadata.
    #[must_use]
    pub fn matches(&self, metadata: &Value) -> bool {
        match self {
            Self::Eq { field, value } => {
                get_field(metadata, field).is_some_and(|v| values_equal(v, value))
            }
            Self::Ne { field, value } => {
                get_field(metadata, field).is_none_or(|v| !values_equal(v, value))
            }
            Self::Gt { field, value } => {
                get_field(metadata, field).is_some_and(|v| compare_values(v, value) > 0)
            }
            Self::Gte { field, value } => {
                get_field(metadata, field).is_some_and(|v| compare_values(v, value) >= 0)
            }
            Self::Lt { field, value } => {
                get_field(metadata, field).is_some_and(|v| compare_values(v, value) < 0)
            }
            Self::Lte { field, value } => {
                get_field(metadata, field).is_some_and(|v| compare_values(v, value) <= 0)
            }
            Self::In { field, values } => get_field(metadata, field)
                .is_some_and(|v| values.iter().any(|val| values_equal(v, val))),
            Self::NotIn { field, values } => get_field(metadata, field)
                .is_none_or(|v| !values.iter().any(|val| values_equal(v, val))),
            Self::Contains { field, value } => {
                get_field(metadata, field).is_some_and(|v| value_contains(v, value))
            }
            Self::Exists { field } => get_field(metadata, field).is_some(),
            Self::And { conditions } => conditions.iter().all(|c| c.matches(metadata)),
            Self::Or { conditions } => conditions.iter().any(|c| c.matches(metadata)),
            Self::Not { condition } => !condition.matches(metadata),
        }
    }
}

/// Looks up a field in a JSON object, supporting dot notation for nested
/// objects (e.g. `"address.city"`).
fn get_field<'a>(metadata: &'a Value, field: &str) -> Option<&'a Value> {
    let mut current = metadata;
    for part in field.split('.') {
        current = current.get(part)?;
    }
    Some(current)
}

/// Structural equality for JSON values, with numeric comparison done in f64
/// so `2024` and `2024.0` compare equal.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .zip(b.as_f64())
            .is_some_and(|(a, b)| (a - b).abs() < f64::EPSILON),
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Array(a), Value::Array(b)) => a == b,
        (Value::Object(a), Value::Object(b)) => a == b,
        _ => false,
    }
}

/// Orders two JSON values; returns 0 (neither greater nor less) for
/// incomparable types rather than panicking, so `gt`/`lt` simply fail to
/// match instead of erroring.
fn compare_values(a: &Value, b: &Value) -> i32 {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).map_or(0, |ord| ord as i32),
            _ => 0,
        },
        (Value::String(a), Value::String(b)) => match a.cmp(b) {
            std::cmp::Ordering::Less => -1,
            std::cmp::Ordering::Equal => 0,
            std::cmp::Ordering::Greater => 1,
        },
        _ => 0,
    }
}

/// Type-dispatched `contains`: strings check substring, arrays check
/// element equality. Other types never contain anything (per-type
/// dispatch avoids stringly-typed coercion bugs, per spec §9).
fn value_contains(haystack: &Value, needle: &Value) -> bool {
    match haystack {
        Value::String(s) => needle.as_str().is_some_and(|n| s.contains(n)),
        Value::Array(items) => items.iter().any(|item| values_equal(item, needle)),
        _ => false,
    }
}
