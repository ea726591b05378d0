//! Storage layer of the tabula ORM.
//!
//! Provides the [`Executor`] trait defining the storage contract that all
//! backends implement, plus [`SqliteExecutor`] and [`MemoryExecutor`] as
//! interchangeable backends. Application code normally goes through the
//! [`Database`] facade and its typed [`QuerySet`]s.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`config`]: database URL parsing and [`DatabaseConfig`]
//! - [`traits`]: Executor trait definition
//! - [`schema`]: CREATE TABLE synthesis and column affinity
//! - [`sql`]: query plan to SQL rendering
//! - [`sqlite`]: SqliteExecutor implementation
//! - [`memory`]: MemoryExecutor implementation
//! - [`database`]: the CRUD facade
//! - [`queryset`]: typed chainable queries
//! - [`migrate`]: multi-model table creation

pub mod config;
pub mod database;
pub mod error;
pub mod memory;
pub mod migrate;
pub mod queryset;
pub mod schema;
pub mod sql;
pub mod sqlite;
pub mod traits;

// Re-export key types for ergonomic use.
pub use config::{BackendKind, DatabaseConfig, SqliteLocation};
pub use database::Database;
pub use error::StorageError;
pub use memory::MemoryExecutor;
pub use migrate::Migrations;
pub use queryset::QuerySet;
pub use sqlite::SqliteExecutor;
pub use traits::Executor;
