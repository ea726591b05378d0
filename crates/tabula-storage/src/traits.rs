//! The [`Executor`] trait defining the storage contract for query plans.
//!
//! Executors receive values that are already normalized to storage classes
//! and plans whose columns were validated when they were built. Both
//! backends ([`SqliteExecutor`] and [`MemoryExecutor`]) implement this
//! trait with observably identical results, so they are fully swappable.
//!
//! [`SqliteExecutor`]: crate::SqliteExecutor
//! [`MemoryExecutor`]: crate::MemoryExecutor

use tabula_core::{Attributes, ModelSchema, QueryPlan};

use crate::config::BackendKind;
use crate::error::StorageError;

/// Turns query plans into reads and writes against one backend.
///
/// Every call blocks until the backend responds. Implementations are shared
/// across threads and serialize access internally.
pub trait Executor: Send + Sync {
    /// The backend this executor talks to.
    fn backend(&self) -> BackendKind;

    /// Creates the table for `schema` if it does not exist. Idempotent.
    fn ensure_table(&self, schema: &ModelSchema) -> Result<(), StorageError>;

    /// Inserts one row and returns its rowid.
    fn insert(&self, schema: &ModelSchema, row: &Attributes) -> Result<i64, StorageError>;

    /// Every row matching the plan, in plan order.
    fn select(&self, plan: &QueryPlan) -> Result<Vec<Attributes>, StorageError>;

    /// Number of rows matching the plan's predicates.
    fn count(&self, plan: &QueryPlan) -> Result<u64, StorageError>;

    /// Applies `changes` to every row matching the plan's predicates and
    /// returns the number of rows changed.
    fn update(&self, plan: &QueryPlan, changes: &Attributes) -> Result<u64, StorageError>;

    /// Removes every row matching the plan's predicates and returns how many
    /// were removed.
    fn delete(&self, plan: &QueryPlan) -> Result<u64, StorageError>;

    /// Releases the backend. Every later call fails with
    /// [`StorageError::Closed`]; closing twice is a no-op.
    fn close(&self) -> Result<(), StorageError>;
}
