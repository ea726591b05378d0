//! Multi-model table creation.
//!
//! [`Migrations`] collects model types and ensures their tables in
//! registration order. Each step is `CREATE TABLE IF NOT EXISTS`, so a
//! migration set can run on every startup.

use std::fmt;

use tabula_core::{Model, Record};

use crate::database::Database;
use crate::error::StorageError;

struct Step {
    record: &'static str,
    ensure: fn(&Database) -> Result<(), StorageError>,
}

/// An ordered set of model types whose tables should exist.
#[derive(Default)]
pub struct Migrations {
    steps: Vec<Step>,
}

impl fmt::Debug for Migrations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.steps.iter().map(|s| s.record))
            .finish()
    }
}

impl Migrations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `M`. Registering a type twice runs it twice, which is
    /// harmless.
    pub fn model<M: Model>(mut self) -> Self {
        self.steps.push(Step {
            record: <M as Record>::TYPE_NAME,
            ensure: Database::ensure_table::<M>,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Ensures every registered table, stopping at the first failure.
    pub fn run(&self, db: &Database) -> Result<(), StorageError> {
        for step in &self.steps {
            tracing::debug!("migrating {}", step.record);
            (step.ensure)(db)?;
        }
        tracing::info!("migrated {} model(s)", self.steps.len());
        Ok(())
    }
}
