//! Typed, chainable queries.
//!
//! A [`QuerySet`] pairs a [`QueryPlan`] with the executor that will run it.
//! Chain calls (`filter`, `exclude`, `order_by`, `limit`, `offset`) return
//! a new query set and never touch the receiver. A chain call that fails
//! (unknown column, mismatched value) does not interrupt the chain: the
//! error is carried along and returned by whichever terminal runs first.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use tabula_core::mapper;
use tabula_core::{Attributes, CoreError, Model, Predicate, QueryPlan, Value};

use crate::error::StorageError;
use crate::traits::Executor;

/// A lazily executed query over records of type `M`.
pub struct QuerySet<M> {
    executor: Arc<dyn Executor>,
    state: Result<QueryPlan, CoreError>,
    _record: PhantomData<fn() -> M>,
}

impl<M> Clone for QuerySet<M> {
    fn clone(&self) -> Self {
        QuerySet {
            executor: Arc::clone(&self.executor),
            state: self.state.clone(),
            _record: PhantomData,
        }
    }
}

impl<M> fmt::Debug for QuerySet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuerySet").field("state", &self.state).finish()
    }
}

impl<M: Model> QuerySet<M> {
    pub(crate) fn new(executor: Arc<dyn Executor>, state: Result<QueryPlan, CoreError>) -> Self {
        QuerySet {
            executor,
            state,
            _record: PhantomData,
        }
    }

    fn chain(&self, step: impl FnOnce(&QueryPlan) -> Result<QueryPlan, CoreError>) -> Self {
        QuerySet {
            executor: Arc::clone(&self.executor),
            state: self.state.as_ref().map_err(Clone::clone).and_then(step),
            _record: PhantomData,
        }
    }

    /// Adds a `"column"` or `"column__lookup"` condition.
    pub fn filter(&self, field: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.chain(|plan| plan.filter(field, value))
    }

    /// Adds a condition and negates it. Only the condition added by this
    /// call is negated.
    pub fn exclude(&self, field: &str, value: impl Into<Value>) -> Self {
        let value = value.into();
        self.chain(|plan| plan.exclude(field, value))
    }

    /// Orders by one column; `"-column"` sorts descending.
    pub fn order_by(&self, field: &str) -> Self {
        self.chain(|plan| plan.order_by(field))
    }

    pub fn limit(&self, limit: usize) -> Self {
        self.chain(|plan| Ok(plan.limit(limit)))
    }

    pub fn offset(&self, offset: usize) -> Self {
        self.chain(|plan| Ok(plan.offset(offset)))
    }

    /// The accumulated plan, or the first error the chain recorded.
    pub fn plan(&self) -> Result<&QueryPlan, StorageError> {
        self.state.as_ref().map_err(|e| e.clone().into())
    }

    pub fn predicates(&self) -> Result<&[Predicate], StorageError> {
        Ok(self.plan()?.predicates())
    }

    /// Every matching record, in plan order.
    pub fn all(&self) -> Result<Vec<M>, StorageError> {
        let plan = self.plan()?;
        self.executor
            .select(plan)?
            .iter()
            .map(|row| Ok(mapper::materialize(row, plan.schema())?))
            .collect()
    }

    /// The first matching record.
    pub fn first(&self) -> Result<M, StorageError> {
        let plan = self.plan()?;
        self.limit(1)
            .all()?
            .into_iter()
            .next()
            .ok_or_else(|| StorageError::not_found(plan.table(), "no rows match the query"))
    }

    /// Number of matching rows; ordering and pagination are ignored.
    pub fn count(&self) -> Result<u64, StorageError> {
        self.executor.count(self.plan()?)
    }

    pub fn exists(&self) -> Result<bool, StorageError> {
        Ok(self.count()? > 0)
    }

    /// Applies `changes` to every matching row and returns how many rows
    /// changed. With no conditions, every row in the table changes.
    pub fn update<I, K, V>(&self, changes: I) -> Result<u64, StorageError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let plan = self.plan()?;
        let changes: Attributes = changes
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        if changes.is_empty() {
            return Err(StorageError::EmptyUpdate {
                table: plan.table().to_string(),
            });
        }
        let changes = mapper::normalize_changes(plan.schema(), changes)?;
        self.executor.update(plan, &changes)
    }

    /// Removes every matching row and returns how many were removed. With
    /// no conditions, the table is emptied.
    pub fn delete(&self) -> Result<u64, StorageError> {
        self.executor.delete(self.plan()?)
    }

    /// The matching records' persisted fields as a JSON array.
    pub fn to_json(&self) -> Result<serde_json::Value, StorageError> {
        let plan = self.plan()?;
        let records: Vec<Attributes> = self
            .all()?
            .iter()
            .map(|record| mapper::record_values(record, plan.schema()))
            .collect();
        Ok(serde_json::to_value(records)?)
    }
}
