//! Typed filter and update expressions for the document store.
//!
//! Filters arrive from callers as data (a JSON-encoded tree), are validated
//! for shape before execution, and are evaluated against document bodies by
//! the store itself. Ordering comparisons (`gt`/`lt`/...) are defined for
//! numbers and strings only; mismatched types never match.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::Document;

/// Maximum nesting depth accepted by [`Filter::validate`].
pub const MAX_FILTER_DEPTH: usize = 16;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FilterError {
    #[error("Filter field name must not be empty")]
    EmptyField,

    #[error("Filter branch must contain at least one sub-filter")]
    EmptyBranch,

    #[error("Filter nesting exceeds {max} levels")]
    TooDeep { max: usize },

    #[error("Update must assign or unset at least one field")]
    EmptyUpdate,

    #[error("Field '{0}' cannot be modified")]
    ReservedField(String),
}

/// A filter expression tree over document fields.
///
/// Serialized form uses externally tagged variants, e.g.
/// `{"eq": {"field": "gender", "value": "f"}}` or
/// `{"and": [{"eq": ...}, {"gt": ...}]}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Filter {
    /// Matches every document.
    All,
    Eq { field: String, value: Value },
    Ne { field: String, value: Value },
    Gt { field: String, value: Value },
    Gte { field: String, value: Value },
    Lt { field: String, value: Value },
    Lte { field: String, value: Value },
    In { field: String, values: Vec<Value> },
    Exists { field: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

impl Filter {
    /// Equality shorthand used throughout the resolvers.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn and(branches: Vec<Filter>) -> Self {
        Filter::And(branches)
    }

    /// Check the tree shape before execution: field names must be non-empty,
    /// branches non-empty, nesting bounded.
    pub fn validate(&self) -> Result<(), FilterError> {
        self.validate_at(0)
    }

    fn validate_at(&self, depth: usize) -> Result<(), FilterError> {
        if depth > MAX_FILTER_DEPTH {
            return Err(FilterError::TooDeep {
                max: MAX_FILTER_DEPTH,
            });
        }
        match self {
            Filter::All => Ok(()),
            Filter::Eq { field, .. }
            | Filter::Ne { field, .. }
            | Filter::Gt { field, .. }
            | Filter::Gte { field, .. }
            | Filter::Lt { field, .. }
            | Filter::Lte { field, .. }
            | Filter::In { field, .. }
            | Filter::Exists { field } => {
                if field.is_empty() {
                    Err(FilterError::EmptyField)
                } else {
                    Ok(())
                }
            }
            Filter::And(branches) | Filter::Or(branches) => {
                if branches.is_empty() {
                    return Err(FilterError::EmptyBranch);
                }
                branches
                    .iter()
                    .try_for_each(|branch| branch.validate_at(depth + 1))
            }
            Filter::Not(inner) => inner.validate_at(depth + 1),
        }
    }

    /// Evaluate the filter against a document body.
    pub fn matches(&self, doc: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => doc.get(field) == Some(value),
            Filter::Ne { field, value } => doc.get(field) != Some(value),
            Filter::Gt { field, value } => {
                cmp_values(doc.get(field), value) == Some(Ordering::Greater)
            }
            Filter::Gte { field, value } => matches!(
                cmp_values(doc.get(field), value),
                Some(Ordering::Greater) | Some(Ordering::Equal)
            ),
            Filter::Lt { field, value } => cmp_values(doc.get(field), value) == Some(Ordering::Less),
            Filter::Lte { field, value } => matches!(
                cmp_values(doc.get(field), value),
                Some(Ordering::Less) | Some(Ordering::Equal)
            ),
            Filter::In { field, values } => doc
                .get(field)
                .map(|actual| values.contains(actual))
                .unwrap_or(false),
            Filter::Exists { field } => doc.contains_key(field),
            Filter::And(branches) => branches.iter().all(|branch| branch.matches(doc)),
            Filter::Or(branches) => branches.iter().any(|branch| branch.matches(doc)),
            Filter::Not(inner) => !inner.matches(doc),
        }
    }
}

fn cmp_values(actual: Option<&Value>, expected: &Value) -> Option<Ordering> {
    match (actual?, expected) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        _ => None,
    }
}

/// A bulk-update specification: field assignments plus fields to remove.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateSpec {
    #[serde(default)]
    pub set: BTreeMap<String, Value>,
    #[serde(default)]
    pub unset: Vec<String>,
}

impl UpdateSpec {
    pub fn set_field(field: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut set = BTreeMap::new();
        set.insert(field.into(), value.into());
        UpdateSpec {
            set,
            unset: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.set.is_empty() && self.unset.is_empty() {
            return Err(FilterError::EmptyUpdate);
        }
        for field in self.set.keys().chain(self.unset.iter()) {
            if field.is_empty() {
                return Err(FilterError::EmptyField);
            }
            if field == "_id" {
                return Err(FilterError::ReservedField(field.clone()));
            }
        }
        Ok(())
    }

    /// Apply to a document body in place. Returns `true` if anything changed.
    pub fn apply(&self, doc: &mut Document) -> bool {
        let mut changed = false;
        for (field, value) in &self.set {
            if doc.get(field) != Some(value) {
                doc.insert(field.clone(), value.clone());
                changed = true;
            }
        }
        for field in &self.unset {
            if doc.remove(field).is_some() {
                changed = true;
            }
        }
        changed
    }
}

/// Query pagination knobs. There is no implicit limit; the caller owns scope.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FindOptions {
    pub limit: Option<u64>,
    pub skip: Option<u64>,
}

/// A field-projection set. `_id` is always retained.
#[derive(Debug, Clone, Default)]
pub struct Projection(BTreeSet<String>);

impl Projection {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Projection(fields.into_iter().map(Into::into).collect())
    }

    pub fn apply(&self, mut doc: Document) -> Document {
        doc.retain(|field, _| field == "_id" || self.0.contains(field));
        doc
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn eq_matches_field_value() {
        let d = doc(json!({"gender": "f", "age": 40}));
        assert!(Filter::eq("gender", "f").matches(&d));
        assert!(!Filter::eq("gender", "m").matches(&d));
        assert!(!Filter::eq("missing", "f").matches(&d));
    }

    #[test]
    fn ordering_comparisons_on_numbers() {
        let d = doc(json!({"case_no": 7}));
        assert!(Filter::Gt { field: "case_no".into(), value: json!(5) }.matches(&d));
        assert!(!Filter::Gt { field: "case_no".into(), value: json!(7) }.matches(&d));
        assert!(Filter::Gte { field: "case_no".into(), value: json!(7) }.matches(&d));
        assert!(Filter::Lt { field: "case_no".into(), value: json!(8) }.matches(&d));
        assert!(Filter::Lte { field: "case_no".into(), value: json!(7) }.matches(&d));
    }

    #[test]
    fn ordering_on_mismatched_types_never_matches() {
        let d = doc(json!({"case_no": 7}));
        assert!(!Filter::Gt { field: "case_no".into(), value: json!("5") }.matches(&d));
        assert!(!Filter::Lt { field: "case_no".into(), value: json!("9") }.matches(&d));
    }

    #[test]
    fn in_and_exists() {
        let d = doc(json!({"specialization": "surgery"}));
        let f = Filter::In {
            field: "specialization".into(),
            values: vec![json!("surgery"), json!("anesthesia")],
        };
        assert!(f.matches(&d));
        assert!(Filter::Exists { field: "specialization".into() }.matches(&d));
        assert!(!Filter::Exists { field: "middlename".into() }.matches(&d));
    }

    #[test]
    fn and_or_not_combinators() {
        let d = doc(json!({"gender": "f", "case_no": 3}));
        let both = Filter::and(vec![
            Filter::eq("gender", "f"),
            Filter::eq("case_no", 3),
        ]);
        assert!(both.matches(&d));
        let either = Filter::Or(vec![
            Filter::eq("gender", "m"),
            Filter::eq("case_no", 3),
        ]);
        assert!(either.matches(&d));
        assert!(!Filter::Not(Box::new(both)).matches(&d));
    }

    #[test]
    fn validate_rejects_empty_field() {
        let f = Filter::eq("", "x");
        assert_eq!(f.validate(), Err(FilterError::EmptyField));
    }

    #[test]
    fn validate_rejects_empty_branch() {
        assert_eq!(Filter::And(vec![]).validate(), Err(FilterError::EmptyBranch));
        assert_eq!(Filter::Or(vec![]).validate(), Err(FilterError::EmptyBranch));
    }

    #[test]
    fn validate_rejects_excessive_nesting() {
        let mut f = Filter::eq("a", 1);
        for _ in 0..(MAX_FILTER_DEPTH + 1) {
            f = Filter::Not(Box::new(f));
        }
        assert!(matches!(f.validate(), Err(FilterError::TooDeep { .. })));
    }

    #[test]
    fn filter_deserializes_from_tagged_json() {
        let f: Filter = serde_json::from_value(json!({
            "and": [
                {"eq": {"field": "gender", "value": "f"}},
                {"gt": {"field": "case_no", "value": 2}}
            ]
        }))
        .unwrap();
        assert!(f.validate().is_ok());
        let d = doc(json!({"gender": "f", "case_no": 3}));
        assert!(f.matches(&d));
    }

    #[test]
    fn update_spec_applies_set_and_unset() {
        let mut d = doc(json!({"name": "Doe", "middlename": "X"}));
        let spec = UpdateSpec {
            set: [("name".to_string(), json!("Smith"))].into_iter().collect(),
            unset: vec!["middlename".into()],
        };
        assert!(spec.apply(&mut d));
        assert_eq!(d.get("name"), Some(&json!("Smith")));
        assert!(!d.contains_key("middlename"));
    }

    #[test]
    fn update_spec_reports_no_change() {
        let mut d = doc(json!({"name": "Doe"}));
        let spec = UpdateSpec::set_field("name", "Doe");
        assert!(!spec.apply(&mut d));
    }

    #[test]
    fn update_spec_rejects_reserved_and_empty() {
        let spec = UpdateSpec::set_field("_id", "nope");
        assert_eq!(
            spec.validate(),
            Err(FilterError::ReservedField("_id".into()))
        );
        assert_eq!(UpdateSpec::default().validate(), Err(FilterError::EmptyUpdate));
    }

    #[test]
    fn projection_keeps_id() {
        let d = doc(json!({"_id": "abc", "name": "Doe", "gender": "f"}));
        let projected = Projection::new(["name"]).apply(d);
        assert_eq!(projected.len(), 2);
        assert!(projected.contains_key("_id"));
        assert!(projected.contains_key("name"));
    }
}
