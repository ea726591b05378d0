//! Per-type column schema, computed once and cached.
//!
//! [`ModelSchema`] bundles a record type's table binding with its extracted
//! [`ColumnSchema`] list. [`ModelSchema::of`] memoizes the result in a
//! process-wide registry keyed by `TypeId`; extraction failures are not
//! cached, so a broken type reports its error on every call.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use crate::descriptor::{extract_columns, ColumnSchema, FieldDescriptor};
use crate::error::CoreError;
use crate::model::{table_name, Model};

type Registry = RwLock<HashMap<TypeId, Arc<ModelSchema>>>;

fn registry() -> &'static Registry {
    static REGISTRY: OnceLock<Registry> = OnceLock::new();
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// The normalized schema of one record type, bound to a table.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSchema {
    record: &'static str,
    table: String,
    columns: Vec<ColumnSchema>,
}

impl ModelSchema {
    /// Returns the cached schema for `M`, extracting it on first use.
    pub fn of<M: Model>() -> Result<Arc<Self>, CoreError> {
        let key = TypeId::of::<M>();
        if let Some(schema) = registry()
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
        {
            return Ok(Arc::clone(schema));
        }

        let schema = Arc::new(Self::build::<M>()?);
        let mut guard = registry().write().unwrap_or_else(PoisonError::into_inner);
        Ok(Arc::clone(guard.entry(key).or_insert(schema)))
    }

    /// Extracts the schema for `M` without consulting the cache.
    pub fn build<M: Model>() -> Result<Self, CoreError> {
        Self::from_fields(M::TYPE_NAME, table_name::<M>(), &M::fields())
    }

    /// Builds a schema from an explicit descriptor table.
    pub fn from_fields(
        record: &'static str,
        table: impl Into<String>,
        fields: &[FieldDescriptor],
    ) -> Result<Self, CoreError> {
        Ok(ModelSchema {
            record,
            table: table.into(),
            columns: extract_columns(record, fields)?,
        })
    }

    /// The same columns bound to a different table.
    pub fn rebind(&self, table: impl Into<String>) -> Self {
        ModelSchema {
            record: self.record,
            table: table.into(),
            columns: self.columns.clone(),
        }
    }

    pub fn record(&self) -> &'static str {
        self.record
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Like [`column`](Self::column), but an unknown name is an error.
    pub fn require_column(&self, name: &str) -> Result<&ColumnSchema, CoreError> {
        self.column(name).ok_or_else(|| CoreError::UnknownColumn {
            table: self.table.clone(),
            column: name.to_string(),
        })
    }

    /// The column flagged `primary_key`, if any.
    pub fn primary_key(&self) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.constraints.primary_key)
    }

    /// The column whose value the backend assigns on insert, if any.
    pub fn auto_key(&self) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.is_auto_key())
    }
}
