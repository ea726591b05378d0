//! Core error types for tabula-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering the
//! failure modes of schema extraction, value coercion and plan building.
//! None of these touch a backend: they are raised before any statement runs.

use thiserror::Error;

/// Core errors produced by the tabula-core crate.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoreError {
    /// A record type's column tags are invalid, or it cannot be persisted.
    #[error("schema error in {record}: {reason}")]
    Schema { record: String, reason: String },

    /// A lookup received a value of the wrong shape for its column.
    #[error("type mismatch on '{column}__{lookup}': expected {expected}, got {found}")]
    TypeMismatch {
        column: String,
        lookup: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// A filter, ordering or update referenced a column the table lacks.
    #[error("unknown column '{column}' on table {table}")]
    UnknownColumn { table: String, column: String },

    /// A stored value could not be written back into a record field.
    #[error("cannot convert {found} into {record}.{field} ({expected})")]
    Conversion {
        record: &'static str,
        field: String,
        expected: &'static str,
        found: &'static str,
    },
}

impl CoreError {
    /// Shorthand for a [`CoreError::Schema`] with an owned reason.
    pub fn schema(record: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::Schema {
            record: record.into(),
            reason: reason.into(),
        }
    }
}
