//! SQLite storage backend.
//!
//! # Responsibility
//! - Compile predicates, sort keys and pagination into parameterized SQL.
//! - Map record field maps onto table rows and back.
//!
//! # Invariants
//! - Field values travel exclusively as bound parameters; identifiers are
//!   quoted. No value is ever interpolated into statement text.
//! - Mutating statements run inside an implicit transaction that `commit`
//!   finishes; read paths never open one.
//! - A failed statement or commit rolls the transaction back, so one
//!   operation's pending write never leaks into the next commit.
//! - Table schemas are owned by the caller and applied via
//!   `SqliteBackend::with_schema`, not by this module.

use crate::db::{open_db, open_db_in_memory, DbError};
use crate::model::contract::{MappingError, StorageRecord};
use crate::query::{FieldValue, FindRequest, Predicate, RecordFields, SortDirection};
use crate::session::{SessionError, SessionProvider, SessionResult, StorageSession};
use rusqlite::types::{Value, ValueRef};
use rusqlite::{params_from_iter, Connection};
use std::path::{Path, PathBuf};

impl From<rusqlite::Error> for SessionError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    InMemory,
}

/// Provider for SQLite-backed sessions.
///
/// Each `make()` opens a fresh connection and applies the optional schema
/// batch, so a repository gets exactly one connection for its lifetime.
#[derive(Debug, Clone)]
pub struct SqliteBackend {
    location: Location,
    schema: Option<String>,
}

impl SqliteBackend {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            location: Location::File(path.as_ref().to_path_buf()),
            schema: None,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: Location::InMemory,
            schema: None,
        }
    }

    /// SQL batch executed once per session, before any repository use.
    /// Callers use `CREATE TABLE IF NOT EXISTS` so reopening a file
    /// database stays idempotent.
    pub fn with_schema(mut self, sql: impl Into<String>) -> Self {
        self.schema = Some(sql.into());
        self
    }
}

impl SessionProvider for SqliteBackend {
    type Session = SqliteSession;

    fn make(&self) -> SessionResult<SqliteSession> {
        let conn = match &self.location {
            Location::File(path) => open_db(path),
            Location::InMemory => open_db_in_memory(),
        }
        .map_err(SessionError::Connection)?;

        if let Some(schema) = &self.schema {
            conn.execute_batch(schema)
                .map_err(|err| SessionError::Connection(DbError::Sqlite(err)))?;
        }

        Ok(SqliteSession::new(conn))
    }
}

/// Session bound to one SQLite connection.
pub struct SqliteSession {
    conn: Connection,
}

impl SqliteSession {
    /// Wraps an already configured connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    fn begin_if_idle(&self) -> SessionResult<()> {
        if self.conn.is_autocommit() {
            self.conn.execute_batch("BEGIN IMMEDIATE;")?;
        }
        Ok(())
    }

    /// Discards the open transaction so a failed operation cannot leak
    /// its pending write into the next operation's commit.
    fn rollback_quietly(&self) {
        if self.conn.is_autocommit() {
            return;
        }
        // A secondary rollback failure leaves nothing more to do here;
        // the original error is the one the caller needs.
        let _ = self.conn.execute_batch("ROLLBACK;");
    }

    fn execute_in_txn(&self, sql: &str, params: Vec<Value>) -> SessionResult<()> {
        if let Err(err) = self.conn.execute(sql, params_from_iter(params)) {
            self.rollback_quietly();
            return Err(err.into());
        }
        Ok(())
    }

    fn first_rowid(&self, entity_name: &str, predicate: &Predicate) -> SessionResult<Option<i64>> {
        let (where_sql, params) = predicate_sql(predicate);
        let sql = format!(
            "SELECT rowid FROM {} WHERE {} LIMIT 1;",
            quote_ident(entity_name),
            where_sql
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(params))?;
        match rows.next()? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }
}

impl StorageSession for SqliteSession {
    fn fetch<R: StorageRecord>(&self, request: &FindRequest) -> SessionResult<Vec<R>> {
        let (where_sql, mut params) = predicate_sql(&request.predicate);
        let mut sql = format!(
            "SELECT * FROM {} WHERE {}",
            quote_ident(R::entity_name()),
            where_sql
        );

        if !request.sort.is_empty() {
            let order: Vec<String> = request
                .sort
                .iter()
                .map(|key| {
                    let direction = match key.direction {
                        SortDirection::Ascending => "ASC",
                        SortDirection::Descending => "DESC",
                    };
                    format!("{} {}", quote_ident(&key.field), direction)
                })
                .collect();
            sql.push_str(" ORDER BY ");
            sql.push_str(&order.join(", "));
        }

        let skip = request.skip.unwrap_or(0);
        if let Some(limit) = request.limit {
            sql.push_str(" LIMIT ?");
            params.push(Value::Integer(i64::from(limit)));
            if skip > 0 {
                sql.push_str(" OFFSET ?");
                params.push(Value::Integer(i64::from(skip)));
            }
        } else if skip > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            params.push(Value::Integer(i64::from(skip)));
        }
        sql.push(';');

        let mut stmt = self.conn.prepare(&sql)?;
        let column_names: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(str::to_string)
            .collect();
        let mut rows = stmt.query(params_from_iter(params))?;

        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = RecordFields::new();
            for (index, name) in column_names.iter().enumerate() {
                fields.insert(name.clone(), column_value(name, row.get_ref(index)?)?);
            }
            records.push(R::from_fields(&fields)?);
        }
        Ok(records)
    }

    fn insert<R: StorageRecord>(&self, record: &R) -> SessionResult<()> {
        self.begin_if_idle()?;
        let fields = record.to_fields();
        let columns: Vec<String> = fields.keys().map(|name| quote_ident(name)).collect();
        let placeholders: Vec<&str> = fields.keys().map(|_| "?").collect();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({});",
            quote_ident(R::entity_name()),
            columns.join(", "),
            placeholders.join(", ")
        );
        let params: Vec<Value> = fields.values().map(bind_value).collect();
        self.execute_in_txn(&sql, params)
    }

    fn replace_first<R: StorageRecord>(
        &self,
        predicate: &Predicate,
        record: &R,
    ) -> SessionResult<bool> {
        // Resolve the target row before taking the write lock so a miss
        // leaves no transaction open.
        let Some(rowid) = self.first_rowid(R::entity_name(), predicate)? else {
            return Ok(false);
        };
        self.begin_if_idle()?;

        let fields = record.to_fields();
        let assignments: Vec<String> = fields
            .keys()
            .map(|name| format!("{} = ?", quote_ident(name)))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE rowid = ?;",
            quote_ident(R::entity_name()),
            assignments.join(", ")
        );
        let mut params: Vec<Value> = fields.values().map(bind_value).collect();
        params.push(Value::Integer(rowid));
        self.execute_in_txn(&sql, params)?;
        Ok(true)
    }

    fn delete_first<R: StorageRecord>(&self, predicate: &Predicate) -> SessionResult<bool> {
        let Some(rowid) = self.first_rowid(R::entity_name(), predicate)? else {
            return Ok(false);
        };
        self.begin_if_idle()?;
        let sql = format!(
            "DELETE FROM {} WHERE rowid = ?;",
            quote_ident(R::entity_name())
        );
        self.execute_in_txn(&sql, vec![Value::Integer(rowid)])?;
        Ok(true)
    }

    fn commit(&self) -> SessionResult<()> {
        if self.conn.is_autocommit() {
            return Ok(());
        }
        if let Err(err) = self.conn.execute_batch("COMMIT;") {
            // The failed write must not stay pending: a later commit on
            // this session would persist it after the caller was told it
            // failed.
            self.rollback_quietly();
            return Err(err.into());
        }
        Ok(())
    }
}

fn predicate_sql(predicate: &Predicate) -> (String, Vec<Value>) {
    let mut params = Vec::new();
    let sql = render_predicate(predicate, &mut params);
    (sql, params)
}

fn render_predicate(predicate: &Predicate, params: &mut Vec<Value>) -> String {
    match predicate {
        Predicate::All => "1 = 1".to_string(),
        Predicate::Eq { field, value } => {
            if value.is_null() {
                format!("{} IS NULL", quote_ident(field))
            } else {
                params.push(bind_value(value));
                format!("{} = ?", quote_ident(field))
            }
        }
        Predicate::Ne { field, value } => {
            if value.is_null() {
                format!("{} IS NOT NULL", quote_ident(field))
            } else {
                // NULL must count as "different", matching in-memory semantics.
                params.push(bind_value(value));
                let column = quote_ident(field);
                format!("({column} IS NULL OR {column} <> ?)")
            }
        }
        Predicate::Gt { field, value } => render_ordering(field, value, ">", params),
        Predicate::Lt { field, value } => render_ordering(field, value, "<", params),
        Predicate::And(parts) => {
            if parts.is_empty() {
                "1 = 1".to_string()
            } else {
                let rendered: Vec<String> = parts
                    .iter()
                    .map(|part| render_predicate(part, params))
                    .collect();
                format!("({})", rendered.join(" AND "))
            }
        }
        Predicate::Or(parts) => {
            if parts.is_empty() {
                "0 = 1".to_string()
            } else {
                let rendered: Vec<String> = parts
                    .iter()
                    .map(|part| render_predicate(part, params))
                    .collect();
                format!("({})", rendered.join(" OR "))
            }
        }
    }
}

fn render_ordering(
    field: &str,
    value: &FieldValue,
    operator: &str,
    params: &mut Vec<Value>,
) -> String {
    if value.is_null() {
        // Ordering against NULL matches nothing.
        return "0 = 1".to_string();
    }
    params.push(bind_value(value));
    format!("{} {} ?", quote_ident(field), operator)
}

fn bind_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        FieldValue::Integer(number) => Value::Integer(*number),
        FieldValue::Real(number) => Value::Real(*number),
        FieldValue::Text(text) => Value::Text(text.clone()),
    }
}

fn column_value(name: &str, value: ValueRef<'_>) -> SessionResult<FieldValue> {
    match value {
        ValueRef::Null => Ok(FieldValue::Null),
        ValueRef::Integer(number) => Ok(FieldValue::Integer(number)),
        ValueRef::Real(number) => Ok(FieldValue::Real(number)),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Ok(FieldValue::Text(text.to_string())),
            Err(_) => Err(MappingError::invalid(name, "non-UTF-8 text column").into()),
        },
        ValueRef::Blob(_) => Err(MappingError::invalid(name, "BLOB columns are not supported").into()),
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::{predicate_sql, quote_ident};
    use crate::query::{FieldValue, Predicate};
    use rusqlite::types::Value;

    #[test]
    fn eq_renders_placeholder_with_bound_value() {
        let (sql, params) = predicate_sql(&Predicate::eq("id", "abc"));
        assert_eq!(sql, "\"id\" = ?");
        assert_eq!(params, vec![Value::Text("abc".to_string())]);
    }

    #[test]
    fn eq_null_renders_is_null_without_params() {
        let (sql, params) = predicate_sql(&Predicate::eq("note", FieldValue::Null));
        assert_eq!(sql, "\"note\" IS NULL");
        assert!(params.is_empty());
    }

    #[test]
    fn ne_counts_null_rows_as_different() {
        let (sql, params) = predicate_sql(&Predicate::ne("age", 3i64));
        assert_eq!(sql, "(\"age\" IS NULL OR \"age\" <> ?)");
        assert_eq!(params.len(), 1);
    }

    #[test]
    fn and_joins_parts_with_shared_param_order() {
        let predicate = Predicate::And(vec![
            Predicate::gt("age", 18i64),
            Predicate::eq("name", "ada"),
        ]);
        let (sql, params) = predicate_sql(&predicate);
        assert_eq!(sql, "(\"age\" > ? AND \"name\" = ?)");
        assert_eq!(
            params,
            vec![Value::Integer(18), Value::Text("ada".to_string())]
        );
    }

    #[test]
    fn hostile_value_stays_a_parameter() {
        // A classic injection payload must never reach statement text.
        let payload = "x\" OR \"1\"=\"1";
        let (sql, params) = predicate_sql(&Predicate::eq("id", payload));
        assert_eq!(sql, "\"id\" = ?");
        assert_eq!(params, vec![Value::Text(payload.to_string())]);
    }

    #[test]
    fn quote_ident_doubles_embedded_quotes() {
        assert_eq!(quote_ident("plain"), "\"plain\"");
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
