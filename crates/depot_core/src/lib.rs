//! Generic repository layer over pluggable storage backends.
//!
//! Maps typed domain entities to persisted records through a declared
//! mapping contract, with predicate-based lookup, ordered/paginated
//! retrieval, upsert and idempotent delete. Storage engines plug in
//! behind the session adapter traits; in-memory and SQLite reference
//! backends ship with the crate.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod session;

pub use logging::{default_log_level, init_logging, logging_status};
pub use model::contract::{required_field, DomainEntity, MappingError, StorageRecord};
pub use query::{FieldValue, FindRequest, Predicate, RecordFields, SortDirection, SortKey};
pub use repo::repository::{BatchError, RepoError, RepoResult, Repository};
pub use session::memory::{MemoryBackend, MemorySession};
pub use session::sqlite::{SqliteBackend, SqliteSession};
pub use session::{SessionError, SessionProvider, SessionResult, StorageSession};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
