//! SQLite implementation of [`Executor`].
//!
//! [`SqliteExecutor`] owns one long-lived connection. `rusqlite::Connection`
//! is `!Sync`, so it sits behind a `Mutex`; the `Option` inside lets
//! [`Executor::close`] take it out for good. Every statement goes through
//! the prepared-statement cache.
//!
//! Connections run with `case_sensitive_like = ON` so `LIKE` matches the
//! case-sensitive lookups, and with foreign keys enforced. File databases
//! additionally use WAL mode.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::{ToSqlOutput, Value as SqlValue, ValueRef};
use rusqlite::{params_from_iter, Connection, ToSql};

use tabula_core::value::format_timestamp;
use tabula_core::{Attributes, ModelSchema, QueryPlan, Value};

use crate::config::{BackendKind, SqliteLocation};
use crate::error::StorageError;
use crate::schema::create_table_sql;
use crate::sql::{self, Statement};
use crate::traits::Executor;

/// SQLite-backed implementation of [`Executor`].
#[derive(Debug)]
pub struct SqliteExecutor {
    conn: Mutex<Option<Connection>>,
    location: SqliteLocation,
    echo: bool,
}

impl SqliteExecutor {
    /// Opens (or creates) a SQLite database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        Self::connect(SqliteLocation::File(path.as_ref().to_path_buf()))
    }

    /// Opens a private in-memory database.
    pub fn in_memory() -> Result<Self, StorageError> {
        Self::connect(SqliteLocation::Memory)
    }

    pub fn connect(location: SqliteLocation) -> Result<Self, StorageError> {
        let conn = match &location {
            SqliteLocation::Memory => Connection::open_in_memory(),
            SqliteLocation::File(path) => Connection::open(path),
        }
        .map_err(|e| StorageError::backend("open", location.to_string(), e))?;

        configure(&conn, matches!(location, SqliteLocation::File(_)))
            .map_err(|e| StorageError::backend("configure", location.to_string(), e))?;
        tracing::info!("opened sqlite database at {}", location);

        Ok(SqliteExecutor {
            conn: Mutex::new(Some(conn)),
            location,
            echo: false,
        })
    }

    /// Logs every statement at `info` instead of `debug`.
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }

    pub fn location(&self) -> &SqliteLocation {
        &self.location
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(|poisoned| {
            tracing::warn!("recovered poisoned connection lock for {}", self.location);
            poisoned.into_inner()
        })
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(StorageError::Closed)?;
        f(conn)
    }

    fn trace(&self, stmt: &Statement) {
        if self.echo {
            tracing::info!(params = stmt.params.len(), "{}", stmt.sql);
        } else {
            tracing::debug!(params = stmt.params.len(), "{}", stmt.sql);
        }
    }

    fn execute(
        &self,
        stmt: &Statement,
        operation: &'static str,
        table: &str,
    ) -> Result<u64, StorageError> {
        self.trace(stmt);
        self.with_conn(|conn| {
            let changed = conn
                .prepare_cached(&stmt.sql)
                .and_then(|mut prepared| prepared.execute(bind(&stmt.params)))
                .map_err(|e| StorageError::backend(operation, table, e))?;
            Ok(changed as u64)
        })
    }
}

fn configure(conn: &Connection, file_backed: bool) -> rusqlite::Result<()> {
    if file_backed {
        // WAL mode for concurrent reads + single writer performance.
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
    }
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "case_sensitive_like", "ON")?;
    Ok(())
}

/// Binds a [`Value`] as a statement parameter.
struct SqlParam<'a>(&'a Value);

impl ToSql for SqlParam<'_> {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self.0 {
            Value::Null => ToSqlOutput::Borrowed(ValueRef::Null),
            Value::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            Value::Real(r) => ToSqlOutput::Owned(SqlValue::Real(*r)),
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Boolean(b) => ToSqlOutput::Owned(SqlValue::Integer(i64::from(*b))),
            Value::Blob(b) => ToSqlOutput::Borrowed(ValueRef::Blob(b)),
            Value::Timestamp(t) => ToSqlOutput::Owned(SqlValue::Text(format_timestamp(t))),
            Value::List(_) => {
                return Err(rusqlite::Error::ToSqlConversionFailure(
                    "list values are only valid as `in` operands".into(),
                ))
            }
        })
    }
}

fn bind(params: &[Value]) -> impl rusqlite::Params + '_ {
    params_from_iter(params.iter().map(SqlParam))
}

fn from_sql(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(r) => Value::Real(r),
        ValueRef::Text(t) => Value::Text(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::Blob(b.to_vec()),
    }
}

fn query_rows(conn: &Connection, stmt: &Statement) -> rusqlite::Result<Vec<Attributes>> {
    let mut prepared = conn.prepare_cached(&stmt.sql)?;
    let names: Vec<String> = prepared
        .column_names()
        .into_iter()
        .map(String::from)
        .collect();

    let mut rows = prepared.query(bind(&stmt.params))?;
    let mut result = Vec::new();
    while let Some(row) = rows.next()? {
        let mut attributes = Attributes::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            attributes.insert(name.clone(), from_sql(row.get_ref(i)?));
        }
        result.push(attributes);
    }
    Ok(result)
}

impl Executor for SqliteExecutor {
    fn backend(&self) -> BackendKind {
        BackendKind::Sqlite(self.location.clone())
    }

    fn ensure_table(&self, schema: &ModelSchema) -> Result<(), StorageError> {
        let ddl = create_table_sql(schema)?;
        tracing::debug!("{}", ddl);
        self.with_conn(|conn| {
            conn.execute_batch(&ddl)
                .map_err(|e| StorageError::backend("create table", schema.table(), e))
        })?;
        tracing::info!("ensured table {}", schema.table());
        Ok(())
    }

    fn insert(&self, schema: &ModelSchema, row: &Attributes) -> Result<i64, StorageError> {
        let stmt = sql::insert(schema.table(), row);
        self.trace(&stmt);
        self.with_conn(|conn| {
            conn.prepare_cached(&stmt.sql)
                .and_then(|mut prepared| prepared.execute(bind(&stmt.params)))
                .map_err(|e| StorageError::backend("insert", schema.table(), e))?;
            Ok(conn.last_insert_rowid())
        })
    }

    fn select(&self, plan: &QueryPlan) -> Result<Vec<Attributes>, StorageError> {
        let stmt = sql::select(plan);
        self.trace(&stmt);
        self.with_conn(|conn| {
            query_rows(conn, &stmt).map_err(|e| StorageError::backend("select", plan.table(), e))
        })
    }

    fn count(&self, plan: &QueryPlan) -> Result<u64, StorageError> {
        let stmt = sql::count(plan);
        self.trace(&stmt);
        self.with_conn(|conn| {
            let count: i64 = conn
                .prepare_cached(&stmt.sql)
                .and_then(|mut prepared| prepared.query_row(bind(&stmt.params), |row| row.get(0)))
                .map_err(|e| StorageError::backend("count", plan.table(), e))?;
            Ok(u64::try_from(count).unwrap_or(0))
        })
    }

    fn update(&self, plan: &QueryPlan, changes: &Attributes) -> Result<u64, StorageError> {
        if changes.is_empty() {
            return Err(StorageError::EmptyUpdate {
                table: plan.table().to_string(),
            });
        }
        self.execute(&sql::update(plan, changes), "update", plan.table())
    }

    fn delete(&self, plan: &QueryPlan) -> Result<u64, StorageError> {
        self.execute(&sql::delete(plan), "delete", plan.table())
    }

    fn close(&self) -> Result<(), StorageError> {
        let mut guard = self.lock();
        if let Some(conn) = guard.take() {
            conn.close()
                .map_err(|(_, e)| StorageError::backend("close", self.location.to_string(), e))?;
            tracing::info!("closed sqlite database at {}", self.location);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::{model, Model};

    model! {
        #[derive(Debug, Default)]
        struct Note {
            #[db = "id,primary_key,auto_increment"]
            id: i64,
            #[db = "body,not_null"]
            body: String,
            #[db = "pinned,default:0"]
            pinned: bool,
        }
    }

    impl Model for Note {}

    fn row(body: &str) -> Attributes {
        let mut row = Attributes::new();
        row.insert("body".into(), Value::from(body));
        row
    }

    #[test]
    fn test_insert_returns_rowid_and_applies_default() {
        let executor = SqliteExecutor::in_memory().unwrap();
        let schema = ModelSchema::of::<Note>().unwrap();
        executor.ensure_table(&schema).unwrap();
        executor.ensure_table(&schema).unwrap();

        assert_eq!(executor.insert(&schema, &row("first")).unwrap(), 1);
        assert_eq!(executor.insert(&schema, &row("second")).unwrap(), 2);

        let rows = executor.select(&QueryPlan::new(schema.clone())).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["id"], Value::Integer(1));
        assert_eq!(rows[0]["pinned"], Value::Integer(0));
        assert_eq!(rows[1]["body"], Value::from("second"));
    }

    #[test]
    fn test_like_is_case_sensitive() {
        let executor = SqliteExecutor::in_memory().unwrap();
        let schema = ModelSchema::of::<Note>().unwrap();
        executor.ensure_table(&schema).unwrap();
        executor.insert(&schema, &row("Hello")).unwrap();

        let plan = QueryPlan::new(schema.clone());
        let lower = plan.filter("body__contains", "hell").unwrap();
        let exact = plan.filter("body__contains", "Hell").unwrap();
        let folded = plan.filter("body__icontains", "hELL").unwrap();
        assert_eq!(executor.count(&lower).unwrap(), 0);
        assert_eq!(executor.count(&exact).unwrap(), 1);
        assert_eq!(executor.count(&folded).unwrap(), 1);
    }

    #[test]
    fn test_constraint_failure_is_backend_error() {
        let executor = SqliteExecutor::in_memory().unwrap();
        let schema = ModelSchema::of::<Note>().unwrap();
        executor.ensure_table(&schema).unwrap();

        let mut bad = Attributes::new();
        bad.insert("body".into(), Value::Null);
        let err = executor.insert(&schema, &bad).unwrap_err();
        assert!(
            matches!(&err, StorageError::Backend { operation: "insert", table, .. } if table == "notes")
        );
        assert!(err.to_string().contains("NOT NULL"));
    }

    #[test]
    fn test_select_from_missing_table_fails() {
        let executor = SqliteExecutor::in_memory().unwrap();
        let schema = ModelSchema::of::<Note>().unwrap();
        let err = executor.select(&QueryPlan::new(schema)).unwrap_err();
        assert!(err.to_string().contains("no such table"));
    }

    #[test]
    fn test_close_is_terminal() {
        let executor = SqliteExecutor::in_memory().unwrap();
        let schema = ModelSchema::of::<Note>().unwrap();
        executor.close().unwrap();
        executor.close().unwrap();
        assert!(matches!(
            executor.ensure_table(&schema),
            Err(StorageError::Closed)
        ));
    }
}
