//! Entity/record capability contract.
//!
//! # Responsibility
//! - Define the bidirectional conversion between a domain entity and its
//!   storage record (`update_record` one way, `to_domain` the other).
//! - Expose per-type storage metadata (entity name, primary key field).
//!
//! # Invariants
//! - `DomainEntity::id` is stable across saves; the repository never
//!   mutates a domain entity.
//! - Round-tripping an entity through `update_record` + `to_domain` must
//!   preserve every mapped field.

use crate::query::{FieldValue, RecordFields};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Conversion failure between a field map and a typed record or entity.
#[derive(Debug)]
pub enum MappingError {
    MissingField(String),
    InvalidValue { field: String, message: String },
}

impl MappingError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl Display for MappingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "missing record field `{field}`"),
            Self::InvalidValue { field, message } => {
                write!(f, "invalid value in record field `{field}`: {message}")
            }
        }
    }
}

impl Error for MappingError {}

/// Backend-side representation of one domain entity.
///
/// `Default` provides the blank record the repository populates when it
/// persists a not-yet-stored entity.
pub trait StorageRecord: Default {
    type Domain;

    /// Canonical record type name (table/collection) in the backend.
    fn entity_name() -> &'static str;

    /// Field holding the entity identifier, used for id-based lookup.
    fn primary_key() -> &'static str;

    /// Projects this record into the field map backends persist.
    fn to_fields(&self) -> RecordFields;

    /// Rebuilds a typed record from persisted fields.
    fn from_fields(fields: &RecordFields) -> Result<Self, MappingError>;

    /// Materializes the domain entity from this record's current fields.
    fn to_domain(&self) -> Result<Self::Domain, MappingError>;
}

/// Caller-facing business object persistable through a `Repository`.
pub trait DomainEntity: Sized {
    /// Opaque, equality-comparable identifier, stable across saves.
    type Id: Clone + PartialEq + Into<FieldValue>;
    type Record: StorageRecord<Domain = Self>;

    fn id(&self) -> Self::Id;

    /// Writes this entity's field values into `record` (domain -> storage).
    fn update_record(&self, record: &mut Self::Record);
}

/// Fetches a field that must be present, for `from_fields` implementations.
pub fn required_field<'a>(
    fields: &'a RecordFields,
    field: &str,
) -> Result<&'a FieldValue, MappingError> {
    fields
        .get(field)
        .ok_or_else(|| MappingError::MissingField(field.to_string()))
}
