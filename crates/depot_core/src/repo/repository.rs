//! Repository operations: lookup, find, insert, upsert, remove.
//!
//! # Responsibility
//! - Implement identifier- and predicate-based access on top of a
//!   `StorageSession`, generically for any entity/record pair.
//!
//! # Invariants
//! - One session per repository instance, created lazily and cached.
//! - `save` is an idempotent upsert keyed on the record's primary key.
//! - Batch operations attempt every item; failures are collected, never
//!   aborted on or hidden.
//!
//! # Concurrency
//! - A repository is confined to one thread (the cached session is not
//!   `Sync`). Callers needing parallelism use one repository per task.

use crate::model::contract::{DomainEntity, MappingError, StorageRecord};
use crate::query::{FindRequest, Predicate};
use crate::session::{SessionError, SessionProvider, StorageSession};
use log::debug;
use once_cell::unsync::OnceCell;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository operation failure.
#[derive(Debug)]
pub enum RepoError {
    /// The session could not be created; this repository instance is
    /// unusable and the caller should rebuild it.
    Connection(SessionError),
    /// A backend read, write, delete or commit failed.
    Persistence(SessionError),
    /// A stored record could not be materialized into its domain entity.
    InvalidData(MappingError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Connection(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "persistence failure: {err}"),
            Self::InvalidData(err) => write!(f, "invalid persisted data: {err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Connection(err) | Self::Persistence(err) => Some(err),
            Self::InvalidData(err) => Some(err),
        }
    }
}

impl From<MappingError> for RepoError {
    fn from(value: MappingError) -> Self {
        Self::InvalidData(value)
    }
}

/// Aggregated failures from a batch operation.
///
/// Every item is attempted; `failures` records the zero-based index of
/// each item that failed together with its error. Successful items stay
/// persisted, there is no cross-item rollback.
#[derive(Debug)]
pub struct BatchError {
    pub failures: Vec<(usize, RepoError)>,
}

impl Display for BatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.failures.first() {
            Some((index, err)) => write!(
                f,
                "{} batch item(s) failed; first at index {index}: {err}",
                self.failures.len()
            ),
            None => write!(f, "batch failed with no recorded items"),
        }
    }
}

impl Error for BatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.failures.first().map(|(_, err)| err as &(dyn Error + 'static))
    }
}

/// Generic repository mapping domain entities to storage records.
///
/// Stateless apart from the cached session: entities live with the caller,
/// records live with the backend, and this type only translates.
pub struct Repository<T: DomainEntity, P: SessionProvider> {
    provider: P,
    session: OnceCell<P::Session>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: DomainEntity, P: SessionProvider> Repository<T, P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider,
            session: OnceCell::new(),
            _entity: PhantomData,
        }
    }

    /// Lazily creates and caches the session; every operation shares it.
    fn session(&self) -> RepoResult<&P::Session> {
        self.session.get_or_try_init(|| {
            debug!(
                "event=session_init module=repo entity={}",
                T::Record::entity_name()
            );
            self.provider.make().map_err(RepoError::Connection)
        })
    }

    fn id_predicate(id: &T::Id) -> Predicate {
        Predicate::eq(T::Record::primary_key(), id.clone())
    }

    /// Looks up one entity by identifier. Absence is not an error.
    pub fn get_by_id(&self, id: &T::Id) -> RepoResult<Option<T>> {
        self.get(&Self::id_predicate(id))
    }

    /// Returns the first entity matching `predicate`, if any.
    pub fn get(&self, predicate: &Predicate) -> RepoResult<Option<T>> {
        let request = FindRequest::matching(predicate.clone()).limit(1);
        Ok(self.find(&request)?.into_iter().next())
    }

    /// Runs a full find request: predicate, sort keys, skip and limit.
    pub fn find(&self, request: &FindRequest) -> RepoResult<Vec<T>> {
        let records: Vec<T::Record> = self
            .session()?
            .fetch(request)
            .map_err(RepoError::Persistence)?;
        records
            .iter()
            .map(|record| record.to_domain().map_err(RepoError::InvalidData))
            .collect()
    }

    /// Persists `entity` as a new record, unconditionally.
    ///
    /// No existence check is made: inserting an identifier that is already
    /// stored creates a second record with the same primary key. Callers
    /// who cannot rule that out should use `save` instead.
    pub fn insert(&self, entity: &T) -> RepoResult<()> {
        let session = self.session()?;
        let mut record = T::Record::default();
        entity.update_record(&mut record);
        session.insert(&record).map_err(RepoError::Persistence)?;
        session.commit().map_err(RepoError::Persistence)
    }

    /// Inserts each entity independently, in order.
    pub fn insert_many(&self, entities: &[T]) -> Result<(), BatchError> {
        self.for_each_collecting(entities, Self::insert)
    }

    /// Upserts `entity`: updates the record matching its identifier, or
    /// creates one when none exists, then commits.
    pub fn save(&self, entity: &T) -> RepoResult<()> {
        let session = self.session()?;
        let predicate = Self::id_predicate(&entity.id());
        let request = FindRequest::matching(predicate.clone()).limit(1);

        let existing: Vec<T::Record> =
            session.fetch(&request).map_err(RepoError::Persistence)?;
        match existing.into_iter().next() {
            Some(mut record) => {
                entity.update_record(&mut record);
                session
                    .replace_first(&predicate, &record)
                    .map_err(RepoError::Persistence)?;
            }
            None => {
                let mut record = T::Record::default();
                entity.update_record(&mut record);
                session.insert(&record).map_err(RepoError::Persistence)?;
            }
        }
        session.commit().map_err(RepoError::Persistence)
    }

    /// Saves each entity independently, in order.
    pub fn save_many(&self, entities: &[T]) -> Result<(), BatchError> {
        self.for_each_collecting(entities, Self::save)
    }

    /// Removes the record backing `entity`, if present.
    pub fn remove(&self, entity: &T) -> RepoResult<()> {
        self.remove_by_id(&entity.id())
    }

    /// Removes the record with the given identifier; a no-op when no
    /// record matches, so removal is idempotent.
    pub fn remove_by_id(&self, id: &T::Id) -> RepoResult<()> {
        let session = self.session()?;
        let deleted = session
            .delete_first::<T::Record>(&Self::id_predicate(id))
            .map_err(RepoError::Persistence)?;
        if !deleted {
            return Ok(());
        }
        session.commit().map_err(RepoError::Persistence)
    }

    fn for_each_collecting(
        &self,
        entities: &[T],
        operation: impl Fn(&Self, &T) -> RepoResult<()>,
    ) -> Result<(), BatchError> {
        let mut failures = Vec::new();
        for (index, entity) in entities.iter().enumerate() {
            if let Err(err) = operation(self, entity) {
                failures.push((index, err));
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(BatchError { failures })
        }
    }
}
