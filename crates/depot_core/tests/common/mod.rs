//! Shared test fixture: a `Contact` entity with its storage record.
#![allow(dead_code)]

use depot_core::{
    required_field, DomainEntity, MappingError, RecordFields, StorageRecord,
};
use uuid::Uuid;

pub const CONTACTS_SCHEMA: &str = "CREATE TABLE IF NOT EXISTS contacts (
    id     TEXT NOT NULL,
    name   TEXT NOT NULL,
    email  TEXT NOT NULL,
    age    INTEGER NOT NULL,
    active INTEGER NOT NULL
);";

#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub active: bool,
}

impl Contact {
    pub fn new(name: &str, email: &str, age: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            email: email.to_string(),
            age,
            active: true,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ContactRecord {
    pub id: String,
    pub name: String,
    pub email: String,
    pub age: i64,
    pub active: bool,
}

impl StorageRecord for ContactRecord {
    type Domain = Contact;

    fn entity_name() -> &'static str {
        "contacts"
    }

    fn primary_key() -> &'static str {
        "id"
    }

    fn to_fields(&self) -> RecordFields {
        let mut fields = RecordFields::new();
        fields.insert("id".to_string(), self.id.clone().into());
        fields.insert("name".to_string(), self.name.clone().into());
        fields.insert("email".to_string(), self.email.clone().into());
        fields.insert("age".to_string(), self.age.into());
        fields.insert("active".to_string(), self.active.into());
        fields
    }

    fn from_fields(fields: &RecordFields) -> Result<Self, MappingError> {
        Ok(Self {
            id: text_field(fields, "id")?,
            name: text_field(fields, "name")?,
            email: text_field(fields, "email")?,
            age: required_field(fields, "age")?
                .as_integer()
                .ok_or_else(|| MappingError::invalid("age", "expected integer"))?,
            active: required_field(fields, "active")?
                .as_bool()
                .ok_or_else(|| MappingError::invalid("active", "expected boolean"))?,
        })
    }

    fn to_domain(&self) -> Result<Contact, MappingError> {
        Ok(Contact {
            id: Uuid::parse_str(&self.id)
                .map_err(|err| MappingError::invalid("id", err.to_string()))?,
            name: self.name.clone(),
            email: self.email.clone(),
            age: self.age,
            active: self.active,
        })
    }
}

impl DomainEntity for Contact {
    type Id = Uuid;
    type Record = ContactRecord;

    fn id(&self) -> Uuid {
        self.id
    }

    fn update_record(&self, record: &mut ContactRecord) {
        record.id = self.id.to_string();
        record.name = self.name.clone();
        record.email = self.email.clone();
        record.age = self.age;
        record.active = self.active;
    }
}

fn text_field(fields: &RecordFields, field: &str) -> Result<String, MappingError> {
    Ok(required_field(fields, field)?
        .as_text()
        .ok_or_else(|| MappingError::invalid(field, "expected text"))?
        .to_string())
}
