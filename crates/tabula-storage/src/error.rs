//! Storage error types for tabula-storage.
//!
//! [`StorageError`] is the error every executor, the [`Database`] facade and
//! [`QuerySet`] terminals return. Build-time failures raised by
//! `tabula-core` convert into the matching variant, so `?` works across the
//! crate boundary. Engine failures are wrapped in [`StorageError::Backend`]
//! with the operation and table attached.
//!
//! [`Database`]: crate::Database
//! [`QuerySet`]: crate::QuerySet

use std::error::Error as StdError;

use tabula_core::{CoreError, ValidationError};
use thiserror::Error;

/// Boxed engine error carried by [`StorageError::Backend`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The record type cannot be mapped to a table.
    #[error("schema error in {record}: {reason}")]
    Schema { record: String, reason: String },

    /// A keyed lookup or `first()` matched no rows.
    #[error("not found in {table}: {detail}")]
    NotFound { table: String, detail: String },

    /// `update` was called without any attribute changes.
    #[error("empty update on {table}")]
    EmptyUpdate { table: String },

    /// A lookup or update value has the wrong shape for its column.
    #[error("type mismatch on '{column}__{lookup}': expected {expected}, got {found}")]
    TypeMismatch {
        column: String,
        lookup: &'static str,
        expected: &'static str,
        found: &'static str,
    },

    /// A filter, ordering or update referenced an unknown column.
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

    /// `Model::validate` rejected the record.
    #[error("validation failed for {record}: {}", join_errors(.errors))]
    Validation {
        record: &'static str,
        errors: Vec<ValidationError>,
    },

    /// The storage engine reported a failure.
    #[error("{operation} on {table} failed: {source}")]
    Backend {
        operation: &'static str,
        table: String,
        #[source]
        source: BoxError,
    },

    /// The database URL does not name a known backend.
    #[error("unsupported database url: {0:?}")]
    UnsupportedUrl(String),

    /// The executor has been closed.
    #[error("database connection is closed")]
    Closed,

    /// JSON serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Wraps an engine error with the operation and table it occurred in.
    pub fn backend(
        operation: &'static str,
        table: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        StorageError::Backend {
            operation,
            table: table.into(),
            source: source.into(),
        }
    }

    pub fn not_found(table: impl Into<String>, detail: impl Into<String>) -> Self {
        StorageError::NotFound {
            table: table.into(),
            detail: detail.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

impl From<CoreError> for StorageError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Schema { record, reason } => StorageError::Schema { record, reason },
            CoreError::TypeMismatch {
                column,
                lookup,
                expected,
                found,
            } => StorageError::TypeMismatch {
                column,
                lookup,
                expected,
                found,
            },
            CoreError::UnknownColumn { table, column } => {
                StorageError::UnknownColumn { table, column }
            }
            CoreError::Conversion {
                record,
                field,
                expected,
                found,
            } => StorageError::Conversion {
                record,
                field,
                expected,
                found,
            },
        }
    }
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
