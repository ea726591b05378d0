//! In-memory implementation of [`Executor`].
//!
//! [`MemoryExecutor`] is a first-class backend for tests and anywhere
//! persistence isn't needed. It interprets query plans directly and
//! reproduces the SQLite behaviour the rest of the crate relies on:
//!
//! - rows are kept in rowid order, and `INTEGER PRIMARY KEY` columns alias
//!   the rowid;
//! - `AUTOINCREMENT` keys never reuse a value that was handed out before;
//! - values pass through the declared type's [`Affinity`] on write and when
//!   used as comparison operands;
//! - `NOT NULL`, `PRIMARY KEY` and `UNIQUE` are enforced, and multi-row
//!   updates apply all-or-nothing;
//! - predicates use SQL three-valued logic, and `LIKE` is case-sensitive.
//!
//! One `RwLock` guards the whole table map: reads share it, writes take it
//! exclusively.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{self, AtomicBool};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use tabula_core::{Attributes, Lookup, ModelSchema, Predicate, QueryPlan, Value};

use crate::config::BackendKind;
use crate::error::StorageError;
use crate::schema::{column_type, default_value, is_rowid_alias, validate, Affinity};
use crate::traits::Executor;

/// Engine-level failures of the mock backend, worded like SQLite's.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    #[error("no such table: {0}")]
    NoSuchTable(String),

    #[error("no such column: {0}")]
    NoSuchColumn(String),

    #[error("table {table} has no column named {column}")]
    UnknownInsertColumn { table: String, column: String },

    #[error("NOT NULL constraint failed: {table}.{column}")]
    NotNull { table: String, column: String },

    #[error("UNIQUE constraint failed: {table}.{column}")]
    Unique { table: String, column: String },

    #[error("datatype mismatch")]
    DatatypeMismatch,
}

#[derive(Debug, Clone)]
struct MemoryColumn {
    name: String,
    affinity: Affinity,
    not_null: bool,
    /// `PRIMARY KEY` or `UNIQUE`, excluding the rowid alias.
    unique: bool,
    default: Value,
}

#[derive(Debug, Clone)]
struct MemoryTable {
    name: String,
    columns: Vec<MemoryColumn>,
    rowid_alias: Option<usize>,
    autoincrement: bool,
    /// Lowest key `AUTOINCREMENT` may hand out next.
    sequence: i64,
    rows: BTreeMap<i64, Attributes>,
}

/// A predicate bound to the table column it tests.
struct Bound<'p> {
    column: &'p str,
    affinity: Affinity,
    predicate: &'p Predicate,
}

impl MemoryTable {
    fn from_schema(schema: &ModelSchema) -> Self {
        let rowid_alias = schema.columns().iter().position(is_rowid_alias);
        let columns = schema
            .columns()
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let affinity = Affinity::from_declared(&column_type(c));
                let default = c
                    .constraints
                    .default
                    .as_deref()
                    .map_or(Value::Null, |literal| affinity.apply(default_value(literal)));
                MemoryColumn {
                    name: c.name.clone(),
                    affinity,
                    not_null: c.constraints.not_null,
                    unique: Some(i) != rowid_alias
                        && (c.constraints.primary_key || c.constraints.unique),
                    default,
                }
            })
            .collect();

        MemoryTable {
            name: schema.table().to_string(),
            columns,
            rowid_alias,
            autoincrement: schema.auto_key().is_some(),
            sequence: 1,
            rows: BTreeMap::new(),
        }
    }

    fn column_index(&self, name: &str) -> Result<usize, MemoryError> {
        self.columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| MemoryError::NoSuchColumn(name.to_string()))
    }

    fn bind<'p>(&'p self, predicates: &'p [Predicate]) -> Result<Vec<Bound<'p>>, MemoryError> {
        predicates
            .iter()
            .map(|predicate| {
                let column = &self.columns[self.column_index(&predicate.column)?];
                Ok(Bound {
                    column: &column.name,
                    affinity: column.affinity,
                    predicate,
                })
            })
            .collect()
    }

    fn matching_keys(&self, predicates: &[Predicate]) -> Result<Vec<i64>, MemoryError> {
        let bound = self.bind(predicates)?;
        Ok(self
            .rows
            .iter()
            .filter(|(_, row)| matches_all(row, &bound))
            .map(|(key, _)| *key)
            .collect())
    }

    fn next_rowid(&self) -> i64 {
        let after_max = self.rows.keys().next_back().map_or(1, |max| max.saturating_add(1));
        if self.autoincrement {
            self.sequence.max(after_max)
        } else {
            after_max
        }
    }

    fn insert(&mut self, row: &Attributes) -> Result<i64, MemoryError> {
        for name in row.keys() {
            if self.column_index(name).is_err() {
                return Err(MemoryError::UnknownInsertColumn {
                    table: self.name.clone(),
                    column: name.clone(),
                });
            }
        }

        let mut record: Attributes = self
            .columns
            .iter()
            .map(|c| {
                let value = row
                    .get(&c.name)
                    .map_or_else(|| c.default.clone(), |v| c.affinity.apply(v.clone()));
                (c.name.clone(), value)
            })
            .collect();

        let rowid = match self.rowid_alias {
            Some(alias) => {
                let key = match &record[alias] {
                    Value::Null => self.next_rowid(),
                    Value::Integer(i) => *i,
                    _ => return Err(MemoryError::DatatypeMismatch),
                };
                record[alias] = Value::Integer(key);
                key
            }
            None => self.next_rowid(),
        };

        self.check_not_null(&record)?;
        if self.rows.contains_key(&rowid) {
            return Err(self.unique_violation(self.rowid_alias));
        }
        for (i, column) in self.columns.iter().enumerate() {
            let value = &record[i];
            if !column.unique || value.is_null() {
                continue;
            }
            let taken = self
                .rows
                .values()
                .any(|existing| existing[i].storage_cmp(value) == Ordering::Equal);
            if taken {
                return Err(self.unique_violation(Some(i)));
            }
        }

        self.rows.insert(rowid, record);
        if self.autoincrement {
            self.sequence = self.sequence.max(rowid.saturating_add(1));
        }
        Ok(rowid)
    }

    /// Applies `changes` to every matching row, or to none of them.
    fn update(&mut self, predicates: &[Predicate], changes: &Attributes) -> Result<u64, MemoryError> {
        let assignments = changes
            .iter()
            .map(|(name, value)| {
                let i = self.column_index(name)?;
                Ok((i, self.columns[i].affinity.apply(value.clone())))
            })
            .collect::<Result<Vec<_>, MemoryError>>()?;

        let keys = self.matching_keys(predicates)?;
        if keys.is_empty() {
            return Ok(0);
        }

        let mut next = self.rows.clone();
        let mut staged = Vec::with_capacity(keys.len());
        for key in &keys {
            let Some(mut row) = next.remove(key) else {
                continue;
            };
            for (i, value) in &assignments {
                row[*i] = value.clone();
            }
            let new_key = match self.rowid_alias {
                Some(alias) => match &row[alias] {
                    Value::Integer(k) => *k,
                    _ => return Err(MemoryError::DatatypeMismatch),
                },
                None => *key,
            };
            self.check_not_null(&row)?;
            staged.push((new_key, row));
        }
        for (key, row) in staged {
            if next.insert(key, row).is_some() {
                return Err(self.unique_violation(self.rowid_alias));
            }
        }

        for (i, _) in &assignments {
            if !self.columns[*i].unique {
                continue;
            }
            let mut values: Vec<&Value> = next
                .values()
                .map(|row| &row[*i])
                .filter(|v| !v.is_null())
                .collect();
            values.sort_by(|a, b| a.storage_cmp(b));
            if values
                .windows(2)
                .any(|pair| pair[0].storage_cmp(pair[1]) == Ordering::Equal)
            {
                return Err(self.unique_violation(Some(*i)));
            }
        }

        self.rows = next;
        Ok(keys.len() as u64)
    }

    fn delete(&mut self, predicates: &[Predicate]) -> Result<u64, MemoryError> {
        let keys = self.matching_keys(predicates)?;
        for key in &keys {
            self.rows.remove(key);
        }
        Ok(keys.len() as u64)
    }

    fn select(&self, plan: &QueryPlan) -> Result<Vec<Attributes>, MemoryError> {
        let bound = self.bind(plan.predicates())?;
        let mut rows: Vec<&Attributes> = self
            .rows
            .values()
            .filter(|row| matches_all(row, &bound))
            .collect();

        if let Some(order) = plan.order() {
            let i = self.column_index(&order.column)?;
            // Stable sort: ties stay in rowid order, as `ORDER BY col, rowid`.
            if order.descending {
                rows.sort_by(|a, b| b[i].storage_cmp(&a[i]));
            } else {
                rows.sort_by(|a, b| a[i].storage_cmp(&b[i]));
            }
        }

        Ok(rows
            .into_iter()
            .skip(plan.offset_value().unwrap_or(0))
            .take(plan.limit_value().unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    fn check_not_null(&self, row: &Attributes) -> Result<(), MemoryError> {
        match self
            .columns
            .iter()
            .enumerate()
            .find(|(i, c)| c.not_null && row[*i].is_null())
        {
            Some((_, column)) => Err(MemoryError::NotNull {
                table: self.name.clone(),
                column: column.name.clone(),
            }),
            None => Ok(()),
        }
    }

    fn unique_violation(&self, column: Option<usize>) -> MemoryError {
        MemoryError::Unique {
            table: self.name.clone(),
            column: column.map_or_else(|| "rowid".to_string(), |i| self.columns[i].name.clone()),
        }
    }
}

fn matches_all(row: &Attributes, bound: &[Bound<'_>]) -> bool {
    bound.iter().all(|b| {
        let stored = row.get(b.column).unwrap_or(&Value::Null);
        evaluate(b.predicate, b.affinity, stored) == Some(true)
    })
}

/// Evaluates one predicate against a stored value. `None` is SQL unknown.
fn evaluate(predicate: &Predicate, affinity: Affinity, stored: &Value) -> Option<bool> {
    let result = match predicate.lookup {
        Lookup::IsNull => Some(stored.is_null() == matches!(predicate.value, Value::Boolean(true))),
        Lookup::In => match &predicate.value {
            Value::List(items) => in_list(stored, affinity, items),
            single => in_list(stored, affinity, std::slice::from_ref(single)),
        },
        Lookup::IExact => {
            let left = stored.textual()?.to_ascii_lowercase();
            let right = predicate.value.textual()?.to_ascii_lowercase();
            Some(left == right)
        }
        Lookup::Contains | Lookup::StartsWith | Lookup::EndsWith => {
            Some(like(&predicate.value.textual()?, &stored.textual()?))
        }
        Lookup::IContains => {
            let pattern = predicate.value.textual()?.to_ascii_lowercase();
            Some(like(&pattern, &stored.textual()?.to_ascii_lowercase()))
        }
        Lookup::Exact | Lookup::Gt | Lookup::Gte | Lookup::Lt | Lookup::Lte => {
            let operand = affinity.apply(predicate.value.clone());
            stored.sql_cmp(&operand).map(|ord| match predicate.lookup {
                Lookup::Gt => ord == Ordering::Greater,
                Lookup::Gte => ord != Ordering::Less,
                Lookup::Lt => ord == Ordering::Less,
                Lookup::Lte => ord != Ordering::Greater,
                _ => ord == Ordering::Equal,
            })
        }
    };
    if predicate.negated {
        result.map(|b| !b)
    } else {
        result
    }
}

/// `x IN (..)`: false for an empty list even when `x` is NULL, otherwise
/// unknown when no element matches and either side held a NULL.
fn in_list(stored: &Value, affinity: Affinity, items: &[Value]) -> Option<bool> {
    if items.is_empty() {
        return Some(false);
    }
    if stored.is_null() {
        return None;
    }
    let mut unknown = false;
    for item in items {
        match stored.sql_eq(&affinity.apply(item.clone())) {
            Some(true) => return Some(true),
            Some(false) => {}
            None => unknown = true,
        }
    }
    if unknown {
        None
    } else {
        Some(false)
    }
}

/// Case-sensitive `LIKE`: `%` matches any run of characters, `_` exactly
/// one.
pub fn like(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();
    let (mut p, mut t) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && pattern[p] == '%' {
            backtrack = Some((p, t));
            p += 1;
        } else if p < pattern.len() && (pattern[p] == '_' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if let Some((star, mark)) = backtrack {
            p = star + 1;
            t = mark + 1;
            backtrack = Some((star, mark + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&c| c == '%')
}

/// In-memory [`Executor`] over a lock-guarded table map.
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    tables: RwLock<HashMap<String, MemoryTable>>,
    closed: AtomicBool,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of the tables created so far, sorted.
    pub fn table_names(&self) -> Result<Vec<String>, StorageError> {
        let mut names: Vec<String> = self.read()?.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, MemoryTable>>, StorageError> {
        self.check_open()?;
        Ok(self.tables.read().unwrap_or_else(|poisoned| {
            tracing::warn!("recovered poisoned mock table lock");
            poisoned.into_inner()
        }))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, MemoryTable>>, StorageError> {
        self.check_open()?;
        Ok(self.tables.write().unwrap_or_else(|poisoned| {
            tracing::warn!("recovered poisoned mock table lock");
            poisoned.into_inner()
        }))
    }

    fn check_open(&self) -> Result<(), StorageError> {
        if self.closed.load(atomic::Ordering::Acquire) {
            Err(StorageError::Closed)
        } else {
            Ok(())
        }
    }
}

fn no_such_table(operation: &'static str, table: &str) -> StorageError {
    StorageError::backend(operation, table, MemoryError::NoSuchTable(table.to_string()))
}

impl Executor for MemoryExecutor {
    fn backend(&self) -> BackendKind {
        BackendKind::Mock
    }

    fn ensure_table(&self, schema: &ModelSchema) -> Result<(), StorageError> {
        validate(schema)?;
        let mut tables = self.write()?;
        if !tables.contains_key(schema.table()) {
            tables.insert(schema.table().to_string(), MemoryTable::from_schema(schema));
            tracing::info!("ensured table {}", schema.table());
        }
        Ok(())
    }

    fn insert(&self, schema: &ModelSchema, row: &Attributes) -> Result<i64, StorageError> {
        validate(schema)?;
        let mut tables = self.write()?;
        let table = tables
            .entry(schema.table().to_string())
            .or_insert_with(|| MemoryTable::from_schema(schema));
        let rowid = table
            .insert(row)
            .map_err(|e| StorageError::backend("insert", schema.table(), e))?;
        tracing::debug!("mock insert into {} assigned rowid {}", schema.table(), rowid);
        Ok(rowid)
    }

    fn select(&self, plan: &QueryPlan) -> Result<Vec<Attributes>, StorageError> {
        tracing::debug!(
            "mock select from {} with {} predicate(s)",
            plan.table(),
            plan.predicates().len()
        );
        let tables = self.read()?;
        let table = tables
            .get(plan.table())
            .ok_or_else(|| no_such_table("select", plan.table()))?;
        table
            .select(plan)
            .map_err(|e| StorageError::backend("select", plan.table(), e))
    }

    fn count(&self, plan: &QueryPlan) -> Result<u64, StorageError> {
        tracing::debug!(
            "mock count on {} with {} predicate(s)",
            plan.table(),
            plan.predicates().len()
        );
        let tables = self.read()?;
        let table = tables
            .get(plan.table())
            .ok_or_else(|| no_such_table("count", plan.table()))?;
        let keys = table
            .matching_keys(plan.predicates())
            .map_err(|e| StorageError::backend("count", plan.table(), e))?;
        Ok(keys.len() as u64)
    }

    fn update(&self, plan: &QueryPlan, changes: &Attributes) -> Result<u64, StorageError> {
        if changes.is_empty() {
            return Err(StorageError::EmptyUpdate {
                table: plan.table().to_string(),
            });
        }
        let mut tables = self.write()?;
        let table = tables
            .get_mut(plan.table())
            .ok_or_else(|| no_such_table("update", plan.table()))?;
        let changed = table
            .update(plan.predicates(), changes)
            .map_err(|e| StorageError::backend("update", plan.table(), e))?;
        tracing::debug!("mock update on {} changed {} row(s)", plan.table(), changed);
        Ok(changed)
    }

    fn delete(&self, plan: &QueryPlan) -> Result<u64, StorageError> {
        let mut tables = self.write()?;
        let table = tables
            .get_mut(plan.table())
            .ok_or_else(|| no_such_table("delete", plan.table()))?;
        let removed = table
            .delete(plan.predicates())
            .map_err(|e| StorageError::backend("delete", plan.table(), e))?;
        tracing::debug!("mock delete on {} removed {} row(s)", plan.table(), removed);
        Ok(removed)
    }

    fn close(&self) -> Result<(), StorageError> {
        if !self.closed.swap(true, atomic::Ordering::AcqRel) {
            tracing::info!("closed mock database");
        }
        Ok(())
    }
}
