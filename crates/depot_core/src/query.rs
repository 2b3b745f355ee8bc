//! Query descriptors: field values, predicates, sorting and pagination.
//!
//! # Responsibility
//! - Define the structured filter language shared by all storage backends.
//! - Keep query values parameterized; no backend may receive them as text.
//!
//! # Invariants
//! - Predicates carry values as `FieldValue`, never as interpolated strings.
//! - A `FindRequest` with no sort keys has backend-natural record order.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Field map shared by storage records and backends.
///
/// Keys are the record's declared field names; iteration order is stable.
pub type RecordFields = BTreeMap<String, FieldValue>;

/// A single persisted field value.
///
/// The variant set mirrors what the reference backends can store natively;
/// richer domain types (ids, timestamps) are carried as one of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Self::Real(value) => Some(*value),
            Self::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    /// Boolean view; accepts the integer encoding (`0`/`1`) backends use.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Integer(0) => Some(false),
            Self::Integer(1) => Some(true),
            _ => None,
        }
    }

    /// Total order used for in-memory sorting.
    ///
    /// Values of the same kind compare naturally, integers and reals compare
    /// numerically, and mixed kinds fall back to a fixed variant rank with
    /// `Null` ordered first.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Real(a), Self::Real(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Self::Integer(a), Self::Real(b)) => {
                (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal)
            }
            (Self::Real(a), Self::Integer(b)) => {
                a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal)
            }
            _ => self.rank().cmp(&other.rank()),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) | Self::Real(_) => 2,
            Self::Text(_) => 3,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Uuid> for FieldValue {
    fn from(value: Uuid) -> Self {
        Self::Text(value.to_string())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Structured filter over record fields.
///
/// Backends either evaluate a predicate directly (in-memory) or compile it
/// into their own parameterized query form (SQL placeholders). Field values
/// are always bound, never spliced into query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Matches every record.
    All,
    Eq { field: String, value: FieldValue },
    Ne { field: String, value: FieldValue },
    Gt { field: String, value: FieldValue },
    Lt { field: String, value: FieldValue },
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Default for Predicate {
    fn default() -> Self {
        Self::All
    }
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn ne(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn gt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn lt(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Evaluates this predicate against one record's fields.
    ///
    /// Missing fields read as `Null`. Equality treats `Null == Null` as a
    /// match; ordering comparisons never match when either side is `Null`,
    /// mirroring SQL semantics so both reference backends agree.
    pub fn matches(&self, fields: &RecordFields) -> bool {
        match self {
            Self::All => true,
            Self::Eq { field, value } => eq_matches(lookup(fields, field), value),
            Self::Ne { field, value } => !eq_matches(lookup(fields, field), value),
            Self::Gt { field, value } => {
                let stored = lookup(fields, field);
                !stored.is_null()
                    && !value.is_null()
                    && stored.compare(value) == Ordering::Greater
            }
            Self::Lt { field, value } => {
                let stored = lookup(fields, field);
                !stored.is_null() && !value.is_null() && stored.compare(value) == Ordering::Less
            }
            Self::And(parts) => parts.iter().all(|part| part.matches(fields)),
            Self::Or(parts) => parts.iter().any(|part| part.matches(fields)),
        }
    }
}

fn lookup<'a>(fields: &'a RecordFields, field: &str) -> &'a FieldValue {
    fields.get(field).unwrap_or(&FieldValue::Null)
}

fn eq_matches(stored: &FieldValue, value: &FieldValue) -> bool {
    match (stored.is_null(), value.is_null()) {
        (true, true) => true,
        (false, false) => stored.compare(value) == Ordering::Equal,
        _ => false,
    }
}

/// Sort direction for one sort key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One field/direction pair within a `FindRequest` sort sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub field: String,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }
}

/// Bulk query descriptor: predicate + ordered sort keys + pagination.
///
/// With both `skip` and `limit` absent the full result set is returned in
/// backend-natural order (undefined inter-record order unless sort keys are
/// given).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindRequest {
    pub predicate: Predicate,
    pub sort: Vec<SortKey>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl FindRequest {
    /// Request matching every record, unsorted and unpaginated.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn matching(predicate: Predicate) -> Self {
        Self {
            predicate,
            ..Self::default()
        }
    }

    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn skip(mut self, count: u32) -> Self {
        self.skip = Some(count);
        self
    }

    pub fn limit(mut self, count: u32) -> Self {
        self.limit = Some(count);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{FieldValue, FindRequest, Predicate, RecordFields, SortKey};
    use std::cmp::Ordering;

    fn row(pairs: &[(&str, FieldValue)]) -> RecordFields {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn eq_matches_same_value_and_rejects_other() {
        let fields = row(&[("name", FieldValue::from("ada"))]);
        assert!(Predicate::eq("name", "ada").matches(&fields));
        assert!(!Predicate::eq("name", "grace").matches(&fields));
    }

    #[test]
    fn eq_on_missing_field_matches_null_only() {
        let fields = row(&[]);
        assert!(Predicate::eq("gone", FieldValue::Null).matches(&fields));
        assert!(!Predicate::eq("gone", 1i64).matches(&fields));
    }

    #[test]
    fn ordering_comparisons_never_match_null() {
        let fields = row(&[("age", FieldValue::Null)]);
        assert!(!Predicate::gt("age", 10i64).matches(&fields));
        assert!(!Predicate::lt("age", 10i64).matches(&fields));
    }

    #[test]
    fn integer_and_real_compare_numerically() {
        assert_eq!(
            FieldValue::Integer(2).compare(&FieldValue::Real(2.0)),
            Ordering::Equal
        );
        assert_eq!(
            FieldValue::Real(1.5).compare(&FieldValue::Integer(2)),
            Ordering::Less
        );
    }

    #[test]
    fn and_or_combine_parts() {
        let fields = row(&[
            ("age", FieldValue::Integer(30)),
            ("name", FieldValue::from("ada")),
        ]);
        let both = Predicate::And(vec![
            Predicate::gt("age", 18i64),
            Predicate::eq("name", "ada"),
        ]);
        assert!(both.matches(&fields));

        let either = Predicate::Or(vec![
            Predicate::eq("name", "grace"),
            Predicate::lt("age", 40i64),
        ]);
        assert!(either.matches(&fields));
    }

    #[test]
    fn find_request_builder_sets_pagination() {
        let request = FindRequest::matching(Predicate::gt("age", 0i64))
            .sort_by(SortKey::asc("age"))
            .skip(2)
            .limit(5);
        assert_eq!(request.skip, Some(2));
        assert_eq!(request.limit, Some(5));
        assert_eq!(request.sort.len(), 1);
    }

    #[test]
    fn predicate_serializes_with_values_in_place() {
        let predicate = Predicate::eq("id", "abc");
        let json = serde_json::to_string(&predicate).unwrap();
        let back: Predicate = serde_json::from_str(&json).unwrap();
        assert_eq!(back, predicate);
    }
}
