//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `depot_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use depot_core::{
    required_field, DomainEntity, MappingError, MemoryBackend, RecordFields, Repository,
    StorageRecord,
};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
struct Probe {
    id: Uuid,
    label: String,
}

#[derive(Debug, Default)]
struct ProbeRecord {
    id: String,
    label: String,
}

impl StorageRecord for ProbeRecord {
    type Domain = Probe;

    fn entity_name() -> &'static str {
        "probes"
    }

    fn primary_key() -> &'static str {
        "id"
    }

    fn to_fields(&self) -> RecordFields {
        let mut fields = RecordFields::new();
        fields.insert("id".to_string(), self.id.clone().into());
        fields.insert("label".to_string(), self.label.clone().into());
        fields
    }

    fn from_fields(fields: &RecordFields) -> Result<Self, MappingError> {
        Ok(Self {
            id: required_field(fields, "id")?
                .as_text()
                .ok_or_else(|| MappingError::invalid("id", "expected text"))?
                .to_string(),
            label: required_field(fields, "label")?
                .as_text()
                .ok_or_else(|| MappingError::invalid("label", "expected text"))?
                .to_string(),
        })
    }

    fn to_domain(&self) -> Result<Probe, MappingError> {
        Ok(Probe {
            id: Uuid::parse_str(&self.id)
                .map_err(|err| MappingError::invalid("id", err.to_string()))?,
            label: self.label.clone(),
        })
    }
}

impl DomainEntity for Probe {
    type Id = Uuid;
    type Record = ProbeRecord;

    fn id(&self) -> Uuid {
        self.id
    }

    fn update_record(&self, record: &mut ProbeRecord) {
        record.id = self.id.to_string();
        record.label = self.label.clone();
    }
}

fn main() {
    println!("depot_core version={}", depot_core::core_version());

    let repository: Repository<Probe, MemoryBackend> = Repository::new(MemoryBackend::new());
    let probe = Probe {
        id: Uuid::new_v4(),
        label: "smoke".to_string(),
    };

    let round_trip = repository
        .save(&probe)
        .and_then(|()| repository.get_by_id(&probe.id))
        .map(|loaded| loaded == Some(probe));
    match round_trip {
        Ok(true) => println!("round_trip=ok"),
        Ok(false) => println!("round_trip=mismatch"),
        Err(err) => println!("round_trip=error {err}"),
    }
}
