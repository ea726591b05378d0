//! The CRUD facade over one executor.
//!
//! [`Database`] is what application code holds: it resolves a model's
//! cached schema, runs lifecycle hooks and validation, lowers records
//! through the mapper, and hands plans to whichever [`Executor`] the
//! configuration selected. Cloning a `Database` shares the executor.

use std::fmt;
use std::sync::Arc;

use tabula_core::mapper::{self, Purpose};
use tabula_core::{Attributes, Model, ModelSchema, QueryPlan, Value};

use crate::config::{BackendKind, DatabaseConfig, SqliteLocation};
use crate::error::StorageError;
use crate::memory::MemoryExecutor;
use crate::queryset::QuerySet;
use crate::sqlite::SqliteExecutor;
use crate::traits::Executor;

/// A handle to one storage backend.
#[derive(Clone)]
pub struct Database {
    executor: Arc<dyn Executor>,
}

impl fmt::Debug for Database {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Database")
            .field("backend", &self.executor.backend())
            .finish()
    }
}

impl Database {
    /// Connects to the backend named by `url`. See [`BackendKind::parse`].
    pub fn connect(url: &str) -> Result<Self, StorageError> {
        Self::from_config(&DatabaseConfig::new(url))
    }

    pub fn from_config(config: &DatabaseConfig) -> Result<Self, StorageError> {
        let executor: Arc<dyn Executor> = match config.backend()? {
            BackendKind::Sqlite(location) => {
                Arc::new(SqliteExecutor::connect(location)?.with_echo(config.debug))
            }
            BackendKind::Mock => Arc::new(MemoryExecutor::new()),
        };
        tracing::info!("database ready: {}", executor.backend());
        Ok(Database { executor })
    }

    /// A database over a fresh mock executor.
    pub fn mock() -> Self {
        Self::with_executor(Arc::new(MemoryExecutor::new()))
    }

    /// A database over a fresh private in-memory SQLite connection.
    pub fn sqlite_memory() -> Result<Self, StorageError> {
        Ok(Self::with_executor(Arc::new(SqliteExecutor::connect(
            SqliteLocation::Memory,
        )?)))
    }

    pub fn with_executor(executor: Arc<dyn Executor>) -> Self {
        Database { executor }
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub fn backend(&self) -> BackendKind {
        self.executor.backend()
    }

    /// Creates `M`'s table if it is absent. Safe to call repeatedly.
    pub fn ensure_table<M: Model>(&self) -> Result<(), StorageError> {
        let schema = ModelSchema::of::<M>()?;
        self.executor.ensure_table(&schema)
    }

    /// Alias of [`ensure_table`](Self::ensure_table).
    pub fn auto_migrate<M: Model>(&self) -> Result<(), StorageError> {
        self.ensure_table::<M>()
    }

    /// Inserts `record`, running `before_create` and validation first.
    ///
    /// When the type has an auto-increment key, the key the backend
    /// assigned is written back into `record`.
    pub fn create<M: Model>(&self, record: &mut M) -> Result<(), StorageError> {
        let schema = ModelSchema::of::<M>()?;
        record.before_create();
        check_valid(record)?;

        let row = mapper::to_attributes(record, &schema, Purpose::Insert)?;
        let rowid = self.executor.insert(&schema, &row)?;
        mapper::assign_generated_key(record, &schema, rowid)?;
        tracing::debug!("created {} row {}", schema.table(), rowid);
        Ok(())
    }

    pub fn find_all<M: Model>(&self) -> Result<Vec<M>, StorageError> {
        self.objects::<M>().all()
    }

    /// The record whose primary key equals `key`.
    pub fn find_by_key<M: Model>(&self, key: impl Into<Value>) -> Result<M, StorageError> {
        let key = key.into();
        let plan = self.key_plan::<M>(key.clone())?;
        let rows = self.executor.select(&plan.limit(1))?;
        match rows.first() {
            Some(row) => Ok(mapper::materialize(row, plan.schema())?),
            None => Err(StorageError::not_found(
                plan.table(),
                format!("no row with key {key}"),
            )),
        }
    }

    /// Writes every non-key column of `record` to the row keyed by `key`.
    pub fn update_by_key<M: Model>(
        &self,
        record: &mut M,
        key: impl Into<Value>,
    ) -> Result<(), StorageError> {
        let key = key.into();
        let plan = self.key_plan::<M>(key.clone())?;
        record.before_update();
        check_valid(record)?;

        let schema = plan.schema();
        let key_column = primary_key_name(schema)?;
        let mut changes: Attributes = mapper::to_attributes(record, schema, Purpose::Update)?;
        changes.shift_remove(key_column);
        if changes.is_empty() {
            return Err(StorageError::EmptyUpdate {
                table: plan.table().to_string(),
            });
        }

        match self.executor.update(&plan, &changes)? {
            0 => Err(StorageError::not_found(
                plan.table(),
                format!("no row with key {key}"),
            )),
            _ => Ok(()),
        }
    }

    pub fn delete_by_key<M: Model>(&self, key: impl Into<Value>) -> Result<(), StorageError> {
        let key = key.into();
        let plan = self.key_plan::<M>(key.clone())?;
        match self.executor.delete(&plan)? {
            0 => Err(StorageError::not_found(
                plan.table(),
                format!("no row with key {key}"),
            )),
            _ => Ok(()),
        }
    }

    /// A query over `M`'s own table.
    pub fn objects<M: Model>(&self) -> QuerySet<M> {
        QuerySet::new(
            Arc::clone(&self.executor),
            ModelSchema::of::<M>().map(QueryPlan::new),
        )
    }

    /// A query over `M`'s columns bound to another table.
    pub fn objects_in<M: Model>(&self, table: &str) -> QuerySet<M> {
        let plan = ModelSchema::of::<M>().map(|schema| QueryPlan::new(Arc::new(schema.rebind(table))));
        QuerySet::new(Arc::clone(&self.executor), plan)
    }

    /// Closes the backend. Every later call fails with
    /// [`StorageError::Closed`].
    pub fn close(&self) -> Result<(), StorageError> {
        self.executor.close()
    }

    fn key_plan<M: Model>(&self, key: Value) -> Result<QueryPlan, StorageError> {
        let schema = ModelSchema::of::<M>()?;
        let column = primary_key_name(&schema)?.to_string();
        Ok(QueryPlan::new(schema).filter(&column, key)?)
    }
}

fn primary_key_name(schema: &ModelSchema) -> Result<&str, StorageError> {
    schema
        .primary_key()
        .map(|c| c.name.as_str())
        .ok_or_else(|| StorageError::Schema {
            record: schema.record().to_string(),
            reason: "keyed operations need a primary_key column".to_string(),
        })
}

fn check_valid<M: Model>(record: &M) -> Result<(), StorageError> {
    let errors = record.validate();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(StorageError::Validation {
            record: M::TYPE_NAME,
            errors,
        })
    }
}
