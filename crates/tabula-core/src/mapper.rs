//! Record ↔ attribute mapping.
//!
//! Lowers a record into an [`Attributes`] mapping of storage-class values
//! and writes backend rows back into records by column-name match.

use crate::descriptor::ColumnSchema;
use crate::error::CoreError;
use crate::model::Record;
use crate::schema::ModelSchema;
use crate::value::{Attributes, Value};

/// What an attribute mapping is being prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purpose {
    /// Insert payload: an unset auto-increment key is left to the backend.
    Insert,
    /// Update payload or key filter: every column is included.
    Update,
}

/// Lowers `record` into one storage-normalized entry per persisted column.
pub fn to_attributes<M: Record>(
    record: &M,
    schema: &ModelSchema,
    purpose: Purpose,
) -> Result<Attributes, CoreError> {
    let mut attributes = Attributes::with_capacity(schema.columns().len());
    for column in schema.columns() {
        let value = record.get_field(column.field).unwrap_or(Value::Null);
        if purpose == Purpose::Insert && column.is_auto_key() && is_unset_key(&value) {
            continue;
        }
        attributes.insert(column.name.clone(), normalize(column, value)?);
    }
    Ok(attributes)
}

/// The record's field values as their natural [`Value`]s, without storage
/// normalization. Used for presentation (JSON), not for persistence.
pub fn record_values<M: Record>(record: &M, schema: &ModelSchema) -> Attributes {
    schema
        .columns()
        .iter()
        .map(|c| {
            let value = record.get_field(c.field).unwrap_or(Value::Null);
            (c.name.clone(), value)
        })
        .collect()
}

/// Writes backend values into `target` by column-name match.
///
/// Unknown incoming columns are discarded; NULLs and missing columns leave
/// the field at its current (usually default) value.
pub fn from_attributes<M: Record>(
    attributes: &Attributes,
    target: &mut M,
    schema: &ModelSchema,
) -> Result<(), CoreError> {
    for (name, value) in attributes {
        let Some(column) = schema.column(name) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        target.set_field(column.field, value.clone())?;
    }
    Ok(())
}

/// Builds a fresh record from a backend row.
pub fn materialize<M: Record>(attributes: &Attributes, schema: &ModelSchema) -> Result<M, CoreError> {
    let mut record = M::default();
    from_attributes(attributes, &mut record, schema)?;
    Ok(record)
}

/// Stores a backend-generated key in the record's auto-increment key field.
///
/// A silent no-op when the type has no such field.
pub fn assign_generated_key<M: Record>(
    record: &mut M,
    schema: &ModelSchema,
    key: i64,
) -> Result<(), CoreError> {
    match schema.auto_key() {
        Some(column) => record.set_field(column.field, Value::Integer(key)),
        None => Ok(()),
    }
}

/// Normalizes `value` to the storage class of `column`.
pub fn normalize(column: &ColumnSchema, value: Value) -> Result<Value, CoreError> {
    value
        .to_storage(column.semantic_type)
        .ok_or_else(|| CoreError::TypeMismatch {
            column: column.name.clone(),
            lookup: "exact",
            expected: column.semantic_type.name(),
            found: value.type_name(),
        })
}

/// Normalizes an arbitrary change set against `schema`, rejecting unknown
/// columns.
pub fn normalize_changes(schema: &ModelSchema, changes: Attributes) -> Result<Attributes, CoreError> {
    changes
        .into_iter()
        .map(|(name, value)| {
            let column = schema.require_column(&name)?;
            Ok((name, normalize(column, value)?))
        })
        .collect()
}

fn is_unset_key(value: &Value) -> bool {
    matches!(value, Value::Null | Value::Integer(0))
}
