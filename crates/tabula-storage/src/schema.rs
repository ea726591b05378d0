//! Schema synthesis: `CREATE TABLE` rendering and column type affinity.
//!
//! Both executors validate a [`ModelSchema`] here before creating a table,
//! so an unmappable record type fails the same way everywhere. The mock
//! executor also takes its value conversion rules from [`Affinity`], which
//! follows SQLite's declared-type rules.

use tabula_core::value::parse_numeric;
use tabula_core::{ColumnSchema, ModelSchema, SemanticType, Value};

use crate::error::StorageError;

/// Quotes an SQL identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// The declared SQL type of a column.
///
/// A `size` bound turns a text column into `VARCHAR(n)`; an explicit
/// `type:` overrides everything and is applied last.
pub fn column_type(column: &ColumnSchema) -> String {
    let constraints = &column.constraints;
    if let Some(explicit) = &constraints.explicit_type {
        return explicit.clone();
    }
    match (column.semantic_type, constraints.max_size) {
        (SemanticType::Text, Some(size)) => format!("VARCHAR({size})"),
        (ty, _) => ty.sql_type().to_string(),
    }
}

/// One column of a `CREATE TABLE` statement.
pub fn column_definition(column: &ColumnSchema) -> String {
    let constraints = &column.constraints;
    let mut def = format!("{} {}", quote_ident(&column.name), column_type(column));
    if constraints.primary_key {
        def.push_str(" PRIMARY KEY");
    }
    if constraints.auto_increment {
        def.push_str(" AUTOINCREMENT");
    }
    if constraints.not_null {
        def.push_str(" NOT NULL");
    }
    if constraints.unique {
        def.push_str(" UNIQUE");
    }
    if let Some(default) = &constraints.default {
        def.push_str(" DEFAULT ");
        def.push_str(default);
    }
    def
}

/// Checks that a schema can be turned into a table.
pub fn validate(schema: &ModelSchema) -> Result<(), StorageError> {
    if schema.columns().is_empty() {
        return Err(StorageError::Schema {
            record: schema.record().to_string(),
            reason: format!("no persistable columns for table {}", schema.table()),
        });
    }
    if let Some(column) = schema.auto_key() {
        if !column_type(column).eq_ignore_ascii_case("INTEGER") {
            return Err(StorageError::Schema {
                record: schema.record().to_string(),
                reason: format!(
                    "auto_increment column '{}' must be declared INTEGER, not {}",
                    column.name,
                    column_type(column)
                ),
            });
        }
    }
    Ok(())
}

/// Renders the idempotent `CREATE TABLE IF NOT EXISTS` statement.
pub fn create_table_sql(schema: &ModelSchema) -> Result<String, StorageError> {
    validate(schema)?;
    let columns: Vec<String> = schema
        .columns()
        .iter()
        .map(|c| format!("  {}", column_definition(c)))
        .collect();
    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
        quote_ident(schema.table()),
        columns.join(",\n")
    ))
}

/// True when the column is an alias for the table's rowid.
pub fn is_rowid_alias(column: &ColumnSchema) -> bool {
    column.constraints.primary_key && column_type(column).eq_ignore_ascii_case("INTEGER")
}

/// Column type affinity, derived from the declared type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    Integer,
    Text,
    Blob,
    Real,
    Numeric,
}

impl Affinity {
    pub fn from_declared(declared: &str) -> Self {
        let upper = declared.to_ascii_uppercase();
        if upper.contains("INT") {
            Affinity::Integer
        } else if upper.contains("CHAR") || upper.contains("CLOB") || upper.contains("TEXT") {
            Affinity::Text
        } else if upper.contains("BLOB") || upper.trim().is_empty() {
            Affinity::Blob
        } else if upper.contains("REAL") || upper.contains("FLOA") || upper.contains("DOUB") {
            Affinity::Real
        } else {
            Affinity::Numeric
        }
    }

    pub fn of(column: &ColumnSchema) -> Self {
        Self::from_declared(&column_type(column))
    }

    /// Converts a value the way storing it in a column of this affinity
    /// would. Also applied to the right-hand operand of comparisons.
    pub fn apply(self, value: Value) -> Value {
        match (self, value) {
            (Affinity::Integer | Affinity::Numeric, Value::Text(s)) => {
                parse_numeric(&s).unwrap_or(Value::Text(s))
            }
            (Affinity::Integer | Affinity::Numeric, Value::Real(r))
                if r.fract() == 0.0 && r.abs() < 9.0e18 =>
            {
                Value::Integer(r as i64)
            }
            (Affinity::Real, Value::Text(s)) => match parse_numeric(&s) {
                Some(Value::Integer(i)) => Value::Real(i as f64),
                Some(other) => other,
                None => Value::Text(s),
            },
            (Affinity::Real, Value::Integer(i)) => Value::Real(i as f64),
            // Integral reals are stored as integers and come back positive.
            (Affinity::Real, Value::Real(r)) if r == 0.0 => Value::Real(0.0),
            (Affinity::Text, v @ (Value::Integer(_) | Value::Real(_))) => {
                v.textual().map_or(Value::Null, Value::Text)
            }
            (_, v) => v,
        }
    }
}

/// Interprets a `DEFAULT` literal as a value, the way the engine would
/// before applying column affinity.
pub fn default_value(literal: &str) -> Value {
    let literal = literal.trim();
    if let Some(inner) = literal
        .strip_prefix('\'')
        .and_then(|rest| rest.strip_suffix('\''))
    {
        return Value::Text(inner.replace("''", "'"));
    }
    match literal.to_ascii_uppercase().as_str() {
        "NULL" => Value::Null,
        "TRUE" => Value::Integer(1),
        "FALSE" => Value::Integer(0),
        "CURRENT_TIMESTAMP" => {
            Value::Text(chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string())
        }
        _ => parse_numeric(literal).unwrap_or_else(|| Value::Text(literal.to_string())),
    }
}
