//! Storage session adapter contract and backend implementations.
//!
//! # Responsibility
//! - Define what a backend must provide for the generic repository:
//!   session creation, typed fetch, record writes, commit.
//! - Isolate backend specifics behind `SessionProvider`/`StorageSession`.
//!
//! # Invariants
//! - Fetch is parametrized by the target record type at the call site;
//!   backends never hand out untyped results for callers to downcast.
//! - Sessions are confined to one thread; callers needing concurrency
//!   coordinate externally or use one repository per task.

use crate::db::DbError;
use crate::model::contract::{MappingError, StorageRecord};
use crate::query::{FindRequest, Predicate};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory;
pub mod sqlite;

pub type SessionResult<T> = Result<T, SessionError>;

/// Failure raised by a storage backend session.
#[derive(Debug)]
pub enum SessionError {
    /// Session creation failed; no usable handle exists.
    Connection(DbError),
    /// The backend failed to execute a statement.
    Db(DbError),
    /// The backend refused a write.
    Rejected(String),
    /// A fetched row could not be materialized into the requested type.
    InvalidRecord(MappingError),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(err) => write!(f, "failed to open storage session: {err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::Rejected(message) => write!(f, "write rejected by backend: {message}"),
            Self::InvalidRecord(err) => write!(f, "{err}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection(err) | Self::Db(err) => Some(err),
            Self::Rejected(_) => None,
            Self::InvalidRecord(err) => Some(err),
        }
    }
}

impl From<MappingError> for SessionError {
    fn from(value: MappingError) -> Self {
        Self::InvalidRecord(value)
    }
}

/// Live handle to the underlying store.
///
/// One session backs one repository instance for its whole lifetime. All
/// operations are synchronous and bounded by the backend's own I/O latency.
pub trait StorageSession {
    /// Fetches records of type `R` matching the request, in declared sort
    /// order, windowed by the request's skip/limit.
    fn fetch<R: StorageRecord>(&self, request: &FindRequest) -> SessionResult<Vec<R>>;

    /// Stores a new record unconditionally.
    fn insert<R: StorageRecord>(&self, record: &R) -> SessionResult<()>;

    /// Overwrites the first record matching `predicate` with `record`.
    ///
    /// Returns `false` without writing when nothing matches.
    fn replace_first<R: StorageRecord>(
        &self,
        predicate: &Predicate,
        record: &R,
    ) -> SessionResult<bool>;

    /// Deletes the first record of type `R` matching `predicate`.
    ///
    /// Returns `false` when nothing matches; absence is not an error.
    fn delete_first<R: StorageRecord>(&self, predicate: &Predicate) -> SessionResult<bool>;

    /// Makes prior writes on this session durable.
    ///
    /// Backends without explicit commit semantics return `Ok(())`.
    fn commit(&self) -> SessionResult<()>;
}

/// Storage context provider: produces the session a repository caches.
pub trait SessionProvider {
    type Session: StorageSession;

    /// Constructs a usable session, or fails with a connection error
    /// rather than returning a partially initialized handle.
    fn make(&self) -> SessionResult<Self::Session>;
}
