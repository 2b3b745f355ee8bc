//! In-memory storage backend.
//!
//! # Responsibility
//! - Provide a dependency-free backend for tests and embedded use.
//! - Evaluate predicates, sorting and pagination locally.
//!
//! # Invariants
//! - Every session made by one `MemoryBackend` shares the same tables.
//! - Writes apply immediately; `commit` never fails.
//! - `Rc`/`RefCell` confine the backend to a single thread.

use crate::model::contract::StorageRecord;
use crate::query::{FieldValue, FindRequest, Predicate, RecordFields, SortDirection, SortKey};
use crate::session::{SessionProvider, SessionResult, StorageSession};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::rc::Rc;

type Tables = BTreeMap<String, Vec<RecordFields>>;

/// Shared in-memory store handing out sessions over the same tables.
#[derive(Debug, Default, Clone)]
pub struct MemoryBackend {
    tables: Rc<RefCell<Tables>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows for an entity name; test inspection hook.
    pub fn row_count(&self, entity_name: &str) -> usize {
        self.tables
            .borrow()
            .get(entity_name)
            .map_or(0, Vec::len)
    }
}

impl SessionProvider for MemoryBackend {
    type Session = MemorySession;

    fn make(&self) -> SessionResult<MemorySession> {
        Ok(MemorySession {
            tables: Rc::clone(&self.tables),
        })
    }
}

/// Session over the backend's shared table map.
#[derive(Debug)]
pub struct MemorySession {
    tables: Rc<RefCell<Tables>>,
}

impl StorageSession for MemorySession {
    fn fetch<R: StorageRecord>(&self, request: &FindRequest) -> SessionResult<Vec<R>> {
        let tables = self.tables.borrow();
        let rows: &[RecordFields] = match tables.get(R::entity_name()) {
            Some(table) => table.as_slice(),
            None => &[],
        };

        let mut matched: Vec<&RecordFields> = rows
            .iter()
            .filter(|fields| request.predicate.matches(fields))
            .collect();
        if !request.sort.is_empty() {
            // Vec::sort_by is stable, so equal keys keep insertion order.
            matched.sort_by(|a, b| compare_rows(a, b, &request.sort));
        }

        let skip = request.skip.unwrap_or(0) as usize;
        let windowed = matched.into_iter().skip(skip);
        let windowed: Vec<&RecordFields> = match request.limit {
            Some(limit) => windowed.take(limit as usize).collect(),
            None => windowed.collect(),
        };

        windowed
            .into_iter()
            .map(|fields| R::from_fields(fields).map_err(Into::into))
            .collect()
    }

    fn insert<R: StorageRecord>(&self, record: &R) -> SessionResult<()> {
        self.tables
            .borrow_mut()
            .entry(R::entity_name().to_string())
            .or_default()
            .push(record.to_fields());
        Ok(())
    }

    fn replace_first<R: StorageRecord>(
        &self,
        predicate: &Predicate,
        record: &R,
    ) -> SessionResult<bool> {
        let mut tables = self.tables.borrow_mut();
        let Some(table) = tables.get_mut(R::entity_name()) else {
            return Ok(false);
        };
        match table.iter_mut().find(|fields| predicate.matches(fields)) {
            Some(row) => {
                *row = record.to_fields();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_first<R: StorageRecord>(&self, predicate: &Predicate) -> SessionResult<bool> {
        let mut tables = self.tables.borrow_mut();
        let Some(table) = tables.get_mut(R::entity_name()) else {
            return Ok(false);
        };
        match table.iter().position(|fields| predicate.matches(fields)) {
            Some(index) => {
                table.remove(index);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn commit(&self) -> SessionResult<()> {
        Ok(())
    }
}

fn compare_rows(a: &RecordFields, b: &RecordFields, keys: &[SortKey]) -> Ordering {
    for key in keys {
        let left = a.get(&key.field).cloned().unwrap_or(FieldValue::Null);
        let right = b.get(&key.field).cloned().unwrap_or(FieldValue::Null);
        let ordering = match key.direction {
            SortDirection::Ascending => left.compare(&right),
            SortDirection::Descending => right.compare(&left),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}
