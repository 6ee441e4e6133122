use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A server-checked condition on a document's current fields.
///
/// Used both to filter subscriptions and to guard conditional updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldPredicate {
    Always,
    /// Field is present and equal to the value.
    Equals(String, Value),
    /// Field is missing or null.
    Absent(String),
    /// Field is present and orders strictly before the value. Numbers compare
    /// numerically, strings lexicographically (so ISO dates compare by date).
    LessThan(String, Value),
    AnyOf(Vec<FieldPredicate>),
    AllOf(Vec<FieldPredicate>),
}

impl FieldPredicate {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FieldPredicate::Equals(field.into(), value.into())
    }

    pub fn absent(field: impl Into<String>) -> Self {
        FieldPredicate::Absent(field.into())
    }

    pub fn less_than(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FieldPredicate::LessThan(field.into(), value.into())
    }

    pub fn evaluate(&self, fields: &Map<String, Value>) -> bool {
        match self {
            FieldPredicate::Always => true,
            FieldPredicate::Equals(field, expected) => fields.get(field) == Some(expected),
            FieldPredicate::Absent(field) => {
                matches!(fields.get(field), None | Some(Value::Null))
            }
            FieldPredicate::LessThan(field, bound) => fields
                .get(field)
                .and_then(|value| compare(value, bound))
                .map(|ordering| ordering == Ordering::Less)
                .unwrap_or(false),
            FieldPredicate::AnyOf(predicates) => predicates.iter().any(|p| p.evaluate(fields)),
            FieldPredicate::AllOf(predicates) => predicates.iter().all(|p| p.evaluate(fields)),
        }
    }
}

fn compare(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn equals_requires_presence() {
        let doc = fields(json!({ "viewed": false }));
        assert!(FieldPredicate::equals("viewed", false).evaluate(&doc));
        assert!(!FieldPredicate::equals("viewed", true).evaluate(&doc));
        assert!(!FieldPredicate::equals("missing", false).evaluate(&doc));
    }

    #[test]
    fn absent_matches_missing_and_null() {
        let doc = fields(json!({ "lastReplayDate": null, "username": "ada" }));
        assert!(FieldPredicate::absent("lastReplayDate").evaluate(&doc));
        assert!(FieldPredicate::absent("avatar").evaluate(&doc));
        assert!(!FieldPredicate::absent("username").evaluate(&doc));
    }

    #[test]
    fn less_than_orders_iso_dates() {
        let doc = fields(json!({ "lastReplayDate": "2024-03-09" }));
        assert!(FieldPredicate::less_than("lastReplayDate", "2024-03-10").evaluate(&doc));
        assert!(!FieldPredicate::less_than("lastReplayDate", "2024-03-09").evaluate(&doc));
        assert!(!FieldPredicate::less_than("lastReplayDate", "2023-12-31").evaluate(&doc));
    }

    #[test]
    fn less_than_mismatched_types_is_false() {
        let doc = fields(json!({ "count": 3 }));
        assert!(FieldPredicate::less_than("count", 4).evaluate(&doc));
        assert!(!FieldPredicate::less_than("count", "4").evaluate(&doc));
    }

    #[test]
    fn combinators() {
        let doc = fields(json!({ "a": 1 }));
        let any = FieldPredicate::AnyOf(vec![
            FieldPredicate::absent("a"),
            FieldPredicate::equals("a", 1),
        ]);
        let all = FieldPredicate::AllOf(vec![
            FieldPredicate::absent("b"),
            FieldPredicate::equals("a", 2),
        ]);
        assert!(any.evaluate(&doc));
        assert!(!all.evaluate(&doc));
        assert!(!FieldPredicate::AnyOf(vec![]).evaluate(&doc));
        assert!(FieldPredicate::AllOf(vec![]).evaluate(&doc));
    }
}
