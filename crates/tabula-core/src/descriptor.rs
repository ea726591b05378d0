//! Field descriptors and the column tag grammar.
//!
//! Every record type registers a list of [`FieldDescriptor`]s: the Rust
//! field name, the [`FieldKind`] of its type, and the optional column tag.
//! [`extract_columns`] turns that list into normalized [`ColumnSchema`]
//! entries, which is the only place the tag grammar is interpreted:
//!
//! ```text
//! tag        := name ( "," token )*
//! token      := "primary_key" | "auto_increment" | "not_null" | "unique"
//!             | "default:" literal | "size:" digits | "type:" sql-type
//! ```
//!
//! A missing tag or a tag of `-` excludes the field from persistence.
//! Tokens are order-insensitive and unknown tokens are ignored.

use serde::Serialize;

use crate::error::CoreError;

/// Tag value marking a field as explicitly not persisted.
pub const IGNORE_TAG: &str = "-";

/// The shape of a Rust field type, as seen by the mapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum FieldKind {
    /// `String` and other string-likes.
    Text,
    /// Every signed and unsigned integer width.
    Integer,
    /// `f32` / `f64`.
    Real,
    /// `bool`.
    Boolean,
    /// `Vec<u8>`.
    Blob,
    /// `chrono::DateTime<Utc>`.
    Timestamp,
    /// Anything else; persisted as text.
    Other,
}

impl FieldKind {
    /// The semantic column type this field kind maps to.
    pub const fn semantic_type(self) -> SemanticType {
        match self {
            FieldKind::Text | FieldKind::Other => SemanticType::Text,
            FieldKind::Integer => SemanticType::Integer,
            FieldKind::Real => SemanticType::Real,
            FieldKind::Boolean => SemanticType::Boolean,
            FieldKind::Blob => SemanticType::Blob,
            FieldKind::Timestamp => SemanticType::Timestamp,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Integer => "integer",
            FieldKind::Real => "real",
            FieldKind::Boolean => "boolean",
            FieldKind::Blob => "blob",
            FieldKind::Timestamp => "timestamp",
            FieldKind::Other => "other",
        }
    }
}

/// Backend-neutral column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum SemanticType {
    Text,
    Integer,
    Real,
    Boolean,
    Blob,
    Timestamp,
}

impl SemanticType {
    /// The SQL type name used when no constraint rewrites it.
    pub const fn sql_type(self) -> &'static str {
        match self {
            SemanticType::Text => "TEXT",
            SemanticType::Integer => "INTEGER",
            SemanticType::Real => "REAL",
            SemanticType::Boolean => "BOOLEAN",
            SemanticType::Blob => "BLOB",
            SemanticType::Timestamp => "DATETIME",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            SemanticType::Text => "text",
            SemanticType::Integer => "integer",
            SemanticType::Real => "real",
            SemanticType::Boolean => "boolean",
            SemanticType::Blob => "blob",
            SemanticType::Timestamp => "timestamp",
        }
    }
}

/// Static metadata for one field of a record type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Rust field name.
    pub field: &'static str,
    /// Kind of the field's type.
    pub kind: FieldKind,
    /// Raw column tag, if the field carries one.
    pub tag: Option<&'static str>,
}

impl FieldDescriptor {
    /// A tagged, potentially persisted field.
    pub const fn new(field: &'static str, kind: FieldKind, tag: &'static str) -> Self {
        FieldDescriptor {
            field,
            kind,
            tag: Some(tag),
        }
    }

    /// A field without a column tag. It is never persisted.
    pub const fn untagged(field: &'static str) -> Self {
        FieldDescriptor {
            field,
            kind: FieldKind::Other,
            tag: None,
        }
    }
}

/// Constraint set parsed from a column tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Constraints {
    pub primary_key: bool,
    pub auto_increment: bool,
    pub not_null: bool,
    pub unique: bool,
    /// Raw SQL literal for `DEFAULT`.
    pub default: Option<String>,
    /// Overrides the computed column type outright.
    pub explicit_type: Option<String>,
    /// Bounds a text column (`VARCHAR(n)`).
    pub max_size: Option<u32>,
}

/// Normalized description of one persisted field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnSchema {
    /// Column name in storage.
    pub name: String,
    /// Rust field backing the column.
    pub field: &'static str,
    pub semantic_type: SemanticType,
    pub constraints: Constraints,
}

impl ColumnSchema {
    /// True when the backend assigns this column's value on insert.
    pub fn is_auto_key(&self) -> bool {
        self.constraints.primary_key && self.constraints.auto_increment
    }
}

/// Parses one field's tag. Returns `Ok(None)` for fields that are not
/// persisted.
pub fn parse_field(record: &str, field: &FieldDescriptor) -> Result<Option<ColumnSchema>, CoreError> {
    let Some(tag) = field.tag else {
        return Ok(None);
    };
    let tag = tag.trim();
    if tag.is_empty() || tag == IGNORE_TAG {
        return Ok(None);
    }

    let mut parts = tag.split(',');
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(CoreError::schema(
            record,
            format!("field '{}' has a column tag without a name", field.field),
        ));
    }

    let mut constraints = Constraints::default();
    for token in parts.map(str::trim) {
        match token {
            "primary_key" => constraints.primary_key = true,
            "auto_increment" => constraints.auto_increment = true,
            "not_null" => constraints.not_null = true,
            "unique" => constraints.unique = true,
            _ => {
                if let Some(literal) = token.strip_prefix("default:") {
                    constraints.default = Some(non_empty(record, name, "default", literal)?);
                } else if let Some(size) = token.strip_prefix("size:") {
                    let size = size.trim().parse::<u32>().map_err(|_| {
                        CoreError::schema(record, format!("column '{name}' has invalid size '{size}'"))
                    })?;
                    constraints.max_size = Some(size);
                } else if let Some(ty) = token.strip_prefix("type:") {
                    constraints.explicit_type = Some(non_empty(record, name, "type", ty)?);
                }
                // Anything else is tolerated and ignored.
            }
        }
    }

    if constraints.auto_increment && !constraints.primary_key {
        return Err(CoreError::schema(
            record,
            format!("column '{name}' is auto_increment but not primary_key"),
        ));
    }

    Ok(Some(ColumnSchema {
        name: name.to_string(),
        field: field.field,
        semantic_type: field.kind.semantic_type(),
        constraints,
    }))
}

fn non_empty(record: &str, column: &str, token: &str, value: &str) -> Result<String, CoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(CoreError::schema(
            record,
            format!("column '{column}' has an empty '{token}:' constraint"),
        ));
    }
    Ok(value.to_string())
}

/// Produces the ordered column list for a record type, skipping fields that
/// are not persisted.
///
/// Column names must be unique within a type. An empty result is not an
/// error here; the schema synthesizer rejects it at migration time.
pub fn extract_columns(record: &str, fields: &[FieldDescriptor]) -> Result<Vec<ColumnSchema>, CoreError> {
    let mut columns: Vec<ColumnSchema> = Vec::with_capacity(fields.len());
    for field in fields {
        let Some(column) = parse_field(record, field)? else {
            continue;
        };
        if columns.iter().any(|c| c.name == column.name) {
            return Err(CoreError::schema(
                record,
                format!("duplicate column name '{}'", column.name),
            ));
        }
        columns.push(column);
    }

    if columns.iter().filter(|c| c.constraints.primary_key).count() > 1 {
        return Err(CoreError::schema(record, "more than one primary_key column"));
    }

    Ok(columns)
}
