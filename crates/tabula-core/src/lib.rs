//! Model layer of the tabula ORM.
//!
//! This crate knows nothing about storage engines. It turns record types
//! into column schemas, records into attribute mappings and back, and
//! filter chains into [`QueryPlan`]s that an executor in `tabula-storage`
//! can run.

pub mod descriptor;
pub mod error;
pub mod mapper;
pub mod model;
pub mod query;
pub mod schema;
pub mod value;

// Re-export commonly used types
pub use descriptor::{ColumnSchema, Constraints, FieldDescriptor, FieldKind, SemanticType};
pub use error::CoreError;
pub use mapper::Purpose;
pub use model::{Model, Record, ValidationError};
pub use query::{Lookup, OrderClause, Predicate, QueryPlan};
pub use schema::ModelSchema;
pub use value::{Attributes, FieldType, Value};
