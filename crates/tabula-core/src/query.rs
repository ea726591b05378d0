//! Backend-agnostic query plans.
//!
//! A [`QueryPlan`] is an immutable value: every chain call returns a new
//! plan with the predicate list copied and extended, so a plan can be
//! branched freely. Filter values are normalized to the column's storage
//! class when the predicate is built (see [`Value::to_storage`]), which is
//! what lets the SQL and in-memory executors evaluate identical operands.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

use crate::descriptor::ColumnSchema;
use crate::error::CoreError;
use crate::schema::ModelSchema;
use crate::value::Value;

/// Separator between a column name and its lookup in a filter field.
pub const LOOKUP_SEPARATOR: &str = "__";

/// A named comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Lookup {
    Exact,
    IExact,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    IsNull,
}

impl Lookup {
    /// Parses a lookup name. Unrecognized names fall back to [`Lookup::Exact`].
    pub fn parse(name: &str) -> Self {
        match name {
            "iexact" => Lookup::IExact,
            "contains" => Lookup::Contains,
            "icontains" => Lookup::IContains,
            "startswith" => Lookup::StartsWith,
            "endswith" => Lookup::EndsWith,
            "gt" => Lookup::Gt,
            "gte" => Lookup::Gte,
            "lt" => Lookup::Lt,
            "lte" => Lookup::Lte,
            "in" => Lookup::In,
            "isnull" => Lookup::IsNull,
            _ => Lookup::Exact,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Lookup::Exact => "exact",
            Lookup::IExact => "iexact",
            Lookup::Contains => "contains",
            Lookup::IContains => "icontains",
            Lookup::StartsWith => "startswith",
            Lookup::EndsWith => "endswith",
            Lookup::Gt => "gt",
            Lookup::Gte => "gte",
            Lookup::Lt => "lt",
            Lookup::Lte => "lte",
            Lookup::In => "in",
            Lookup::IsNull => "isnull",
        }
    }

    /// True for lookups evaluated with `LIKE`.
    pub const fn is_pattern(self) -> bool {
        matches!(
            self,
            Lookup::Contains | Lookup::IContains | Lookup::StartsWith | Lookup::EndsWith
        )
    }

    /// True for lookups that fold ASCII case on both operands.
    pub const fn is_case_insensitive(self) -> bool {
        matches!(self, Lookup::IExact | Lookup::IContains)
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Splits `"field__lookup"` into its column and lookup parts.
pub fn split_field(field: &str) -> (&str, Lookup) {
    match field.split_once(LOOKUP_SEPARATOR) {
        Some((column, lookup)) => {
            let lookup = lookup.split(LOOKUP_SEPARATOR).next().unwrap_or_default();
            (column, Lookup::parse(lookup))
        }
        None => (field, Lookup::Exact),
    }
}

/// One condition of a plan's `WHERE` conjunction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Predicate {
    pub column: String,
    pub lookup: Lookup,
    /// The normalized operand. Pattern lookups hold the wrapped pattern,
    /// `in` holds a [`Value::List`], `isnull` holds a [`Value::Boolean`].
    pub value: Value,
    pub negated: bool,
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "NOT({}__{} {})", self.column, self.lookup, self.value)
        } else {
            write!(f, "{}__{} {}", self.column, self.lookup, self.value)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderClause {
    pub column: String,
    pub descending: bool,
}

/// The accumulated description of a filtered, ordered, paginated query.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    schema: Arc<ModelSchema>,
    predicates: Vec<Predicate>,
    order: Option<OrderClause>,
    limit: Option<usize>,
    offset: Option<usize>,
}

impl QueryPlan {
    /// An unfiltered plan over the schema's table.
    pub fn new(schema: Arc<ModelSchema>) -> Self {
        QueryPlan {
            schema,
            predicates: Vec::new(),
            order: None,
            limit: None,
            offset: None,
        }
    }

    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    pub fn shared_schema(&self) -> &Arc<ModelSchema> {
        &self.schema
    }

    pub fn table(&self) -> &str {
        self.schema.table()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn order(&self) -> Option<&OrderClause> {
        self.order.as_ref()
    }

    pub fn limit_value(&self) -> Option<usize> {
        self.limit
    }

    pub fn offset_value(&self) -> Option<usize> {
        self.offset
    }

    /// Appends a predicate parsed from `"column"` or `"column__lookup"`.
    pub fn filter(&self, field: &str, value: impl Into<Value>) -> Result<Self, CoreError> {
        let (column, lookup) = split_field(field);
        let column = self.schema.require_column(column)?;
        let predicate = Predicate {
            column: column.name.clone(),
            lookup,
            value: operand(column, lookup, value.into())?,
            negated: false,
        };
        let mut next = self.clone();
        next.predicates.push(predicate);
        Ok(next)
    }

    /// Like [`filter`](Self::filter), then negates the predicate just added.
    /// Earlier predicates are never touched.
    pub fn exclude(&self, field: &str, value: impl Into<Value>) -> Result<Self, CoreError> {
        let mut next = self.filter(field, value)?;
        if let Some(last) = next.predicates.last_mut() {
            last.negated = true;
        }
        Ok(next)
    }

    /// Sets the single order column; a leading `-` sorts descending.
    /// Replaces any previous ordering.
    pub fn order_by(&self, field: &str) -> Result<Self, CoreError> {
        let (name, descending) = match field.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (field, false),
        };
        let column = self.schema.require_column(name)?;
        let mut next = self.clone();
        next.order = Some(OrderClause {
            column: column.name.clone(),
            descending,
        });
        Ok(next)
    }

    pub fn limit(&self, limit: usize) -> Self {
        let mut next = self.clone();
        next.limit = Some(limit);
        next
    }

    pub fn offset(&self, offset: usize) -> Self {
        let mut next = self.clone();
        next.offset = Some(offset);
        next
    }

    /// The same predicates without ordering or pagination.
    pub fn unpaged(&self) -> Self {
        QueryPlan {
            schema: Arc::clone(&self.schema),
            predicates: self.predicates.clone(),
            order: None,
            limit: None,
            offset: None,
        }
    }
}

fn operand(column: &ColumnSchema, lookup: Lookup, value: Value) -> Result<Value, CoreError> {
    let mismatch = |expected: &'static str, found: &Value| CoreError::TypeMismatch {
        column: column.name.clone(),
        lookup: lookup.name(),
        expected,
        found: found.type_name(),
    };

    match lookup {
        Lookup::IsNull => match value {
            Value::Boolean(_) => Ok(value),
            other => Err(mismatch("boolean", &other)),
        },
        Lookup::In => match value {
            Value::List(items) => items
                .iter()
                .map(|item| {
                    item.to_storage(column.semantic_type)
                        .ok_or_else(|| mismatch(column.semantic_type.name(), item))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(Value::List),
            other => Err(mismatch("list", &other)),
        },
        Lookup::IExact => match value {
            Value::Null => Ok(Value::Null),
            other => other.textual().map(Value::Text).ok_or_else(|| mismatch("scalar", &other)),
        },
        Lookup::Contains | Lookup::IContains | Lookup::StartsWith | Lookup::EndsWith => {
            let text = value.textual().ok_or_else(|| mismatch("scalar", &value))?;
            Ok(Value::Text(match lookup {
                Lookup::StartsWith => format!("{text}%"),
                Lookup::EndsWith => format!("%{text}"),
                _ => format!("%{text}%"),
            }))
        }
        Lookup::Exact | Lookup::Gt | Lookup::Gte | Lookup::Lt | Lookup::Lte => value
            .to_storage(column.semantic_type)
            .ok_or_else(|| mismatch(column.semantic_type.name(), &value)),
    }
}
