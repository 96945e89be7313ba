// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Fluent criteria builder
//!
//! A [`CriteriaBuilder`] accumulates joins, predicates, ordering and paging bounds against
//! one entity type and executes them on the session it was created with. Builder methods
//! take the builder by value and hand it back, so restrictions chain with `?`:
//!
//! ```ignore
//! let open_tasks = Task::query(&uow)?
//!     .join("creator")?
//!     .eq("creator.name", "tom")?
//!     .eq("done", false)?
//!     .order_by_asc("priority")?
//!     .find_list()?;
//! ```

use super::alias::AliasAllocator;
use super::batch::{BatchSplitter, MAX_IN_SIZE};
use super::finder::QueryRestriction;
use super::paged::PagedResultIterator;
use super::plan::{CriteriaPlan, Join, JoinKind, Order, Projection, SortDirection};
use super::predicate::Predicate;
use crate::error::{Error, Result};
use crate::schema::Entity;
use crate::session::PersistenceSession;
use crate::types::Value;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// Query under construction for entity type `T`
///
/// Clones copy the accumulated criteria and are independent queries from then on, so a
/// restricted clone can serve as a sub-query of its original. A builder can never be its
/// own sub-query: the outer builder is consumed while the sub-query is borrowed.
pub struct CriteriaBuilder<T: Entity> {
    session: Arc<dyn PersistenceSession>,
    aliases: AliasAllocator,
    joins: Vec<Join>,
    predicates: Vec<Predicate>,
    orders: Vec<Order>,
    first_result: usize,
    max_rows: usize,
    max_in_size: usize,
    restriction: Option<Arc<dyn QueryRestriction<T>>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> CriteriaBuilder<T> {
    pub fn new(session: Arc<dyn PersistenceSession>) -> Self {
        Self {
            session,
            aliases: AliasAllocator::new(),
            joins: Vec::new(),
            predicates: Vec::new(),
            orders: Vec::new(),
            first_result: 0,
            max_rows: 0,
            max_in_size: MAX_IN_SIZE,
            restriction: None,
            _entity: PhantomData,
        }
    }

    /// Override the number of values per membership clause (at least 1)
    pub fn with_max_in_size(mut self, max_in_size: usize) -> Self {
        self.max_in_size = max_in_size.max(1);
        self
    }

    /// Attach the restriction whose `pre_execute` sees every plan this builder executes
    pub fn with_restriction(mut self, restriction: Arc<dyn QueryRestriction<T>>) -> Self {
        self.restriction = Some(restriction);
        self
    }

    pub fn session(&self) -> &Arc<dyn PersistenceSession> {
        &self.session
    }

    pub fn alias_index(&self) -> u32 {
        self.aliases.index()
    }

    pub fn first_result(&self) -> usize {
        self.first_result
    }

    pub fn max_rows(&self) -> usize {
        self.max_rows
    }

    pub fn has_ordering(&self) -> bool {
        !self.orders.is_empty()
    }

    /// Alias-resolved predicates added so far
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// Resolve a field path against the aliases of this query
    pub fn alialize(&self, field: &str) -> Result<String> {
        self.aliases.alialize(field)
    }

    /// Accumulated criteria without projection, as the session would receive it
    pub fn plan(&self) -> CriteriaPlan {
        CriteriaPlan {
            entity: T::schema().name.clone(),
            joins: self.joins.clone(),
            predicates: self.predicates.clone(),
            orders: self.orders.clone(),
            projection: None,
            first_result: self.first_result,
            max_rows: self.max_rows,
            distinct_root: false,
        }
    }

    // ---- restrictions -------------------------------------------------------

    /// Add an arbitrary predicate; its field paths are resolved through the alias table
    pub fn add(mut self, predicate: Predicate) -> Result<Self> {
        predicate.validate()?;
        let aliases = &self.aliases;
        let resolved = predicate.try_map_fields(&mut |field: &str| aliases.alialize(field))?;
        self.predicates.push(resolved);
        Ok(self)
    }

    pub fn eq(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.add(Predicate::eq(field, value))
    }

    pub fn ne(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.add(Predicate::ne(field, value))
    }

    pub fn ge(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.add(Predicate::ge(field, value))
    }

    pub fn gt(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.add(Predicate::gt(field, value))
    }

    pub fn le(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.add(Predicate::le(field, value))
    }

    pub fn lt(self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.add(Predicate::lt(field, value))
    }

    pub fn eq_property(self, field: &str, other: &str) -> Result<Self> {
        self.add(Predicate::eq_property(field, other))
    }

    pub fn ne_property(self, field: &str, other: &str) -> Result<Self> {
        self.add(Predicate::ne_property(field, other))
    }

    pub fn ge_property(self, field: &str, other: &str) -> Result<Self> {
        self.add(Predicate::ge_property(field, other))
    }

    pub fn gt_property(self, field: &str, other: &str) -> Result<Self> {
        self.add(Predicate::gt_property(field, other))
    }

    pub fn le_property(self, field: &str, other: &str) -> Result<Self> {
        self.add(Predicate::le_property(field, other))
    }

    pub fn lt_property(self, field: &str, other: &str) -> Result<Self> {
        self.add(Predicate::lt_property(field, other))
    }

    pub fn ieq(self, field: &str, value: impl Into<String>) -> Result<Self> {
        self.add(Predicate::ieq(field, value))
    }

    /// Case-insensitive pattern match; `%` matches any run of characters, `_` one character
    pub fn ilike(self, field: &str, pattern: impl Into<String>) -> Result<Self> {
        self.add(Predicate::ilike(field, pattern))
    }

    pub fn between(
        self,
        field: &str,
        low: impl Into<Value>,
        high: impl Into<Value>,
    ) -> Result<Self> {
        self.add(Predicate::between(field, low, high))
    }

    pub fn is_null(self, field: &str) -> Result<Self> {
        self.add(Predicate::is_null(field))
    }

    pub fn is_not_null(self, field: &str) -> Result<Self> {
        self.add(Predicate::is_not_null(field))
    }

    /// Match if any of `predicates` matches
    pub fn or(self, predicates: impl IntoIterator<Item = Predicate>) -> Result<Self> {
        self.add(Predicate::or(predicates))
    }

    /// Match if all of `predicates` match
    pub fn and(self, predicates: impl IntoIterator<Item = Predicate>) -> Result<Self> {
        self.add(Predicate::and(predicates))
    }

    /// Membership test. Value sets larger than the configured clause size are split into
    /// several clauses combined with `or`.
    pub fn is_in<V: Into<Value>>(
        mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let (field, mut clauses) = self.membership_clauses(field, values)?;
        if clauses.len() == 1 {
            self.predicates.extend(clauses.pop());
        } else {
            log::debug!("Split membership test on {} into {} clauses", field, clauses.len());
            self.predicates.push(Predicate::Or(clauses));
        }
        Ok(self)
    }

    /// Negated membership test. Large value sets become one negated clause per batch,
    /// all of which must hold.
    pub fn not_in<V: Into<Value>>(
        mut self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<Self> {
        let (field, clauses) = self.membership_clauses(field, values)?;
        if clauses.len() > 1 {
            log::debug!("Split membership test on {} into {} clauses", field, clauses.len());
        }
        self.predicates
            .extend(clauses.into_iter().map(Predicate::not));
        Ok(self)
    }

    fn membership_clauses<V: Into<Value>>(
        &self,
        field: &str,
        values: impl IntoIterator<Item = V>,
    ) -> Result<(String, Vec<Predicate>)> {
        let values: Vec<Value> = values.into_iter().map(Into::into).collect();
        if values.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "Empty value list for membership test on {}",
                field
            )));
        }
        let field = self.aliases.alialize(field)?;
        let clauses = BatchSplitter::new(self.max_in_size, values)
            .map(|batch| Predicate::In {
                field: field.clone(),
                values: batch,
            })
            .collect();
        Ok((field, clauses))
    }

    /// Match if `field` is among the values of `sub_field` selected by `subquery`
    pub fn in_subquery<U: Entity>(
        self,
        field: &str,
        subquery: &CriteriaBuilder<U>,
        sub_field: &str,
    ) -> Result<Self> {
        self.add_subquery(field, subquery, sub_field, false)
    }

    /// Match if `field` is not among the values of `sub_field` selected by `subquery`
    pub fn not_in_subquery<U: Entity>(
        self,
        field: &str,
        subquery: &CriteriaBuilder<U>,
        sub_field: &str,
    ) -> Result<Self> {
        self.add_subquery(field, subquery, sub_field, true)
    }

    fn add_subquery<U: Entity>(
        mut self,
        field: &str,
        subquery: &CriteriaBuilder<U>,
        sub_field: &str,
        negated: bool,
    ) -> Result<Self> {
        let field = self.aliases.alialize(field)?;
        let subquery = subquery.subquery_plan(sub_field)?;
        self.predicates.push(Predicate::InSubquery {
            field,
            subquery: Box::new(subquery),
            negated,
        });
        Ok(self)
    }

    fn subquery_plan(&self, field: &str) -> Result<CriteriaPlan> {
        let column = self.aliases.alialize(field)?;
        let mut plan = self.plan();
        plan.orders.clear();
        plan.projection = Some(Projection::Property(column));
        Ok(self.finish(plan))
    }

    // ---- joins and ordering -------------------------------------------------

    /// Inner join an association; rows without a match are dropped
    pub fn join(self, association: &str) -> Result<Self> {
        self.add_join(association, JoinKind::Inner)
    }

    /// Left outer join an association; rows without a match are kept
    pub fn left_join(self, association: &str) -> Result<Self> {
        self.add_join(association, JoinKind::LeftOuter)
    }

    fn add_join(mut self, association: &str, kind: JoinKind) -> Result<Self> {
        let path = self.aliases.alialize(association)?;
        let alias = self.aliases.create_alias(association)?;
        self.joins.push(Join { path, alias, kind });
        Ok(self)
    }

    pub fn order_by_asc(self, field: &str) -> Result<Self> {
        self.add_order(field, SortDirection::Asc)
    }

    pub fn order_by_desc(self, field: &str) -> Result<Self> {
        self.add_order(field, SortDirection::Desc)
    }

    fn add_order(mut self, field: &str, direction: SortDirection) -> Result<Self> {
        let field = self.aliases.alialize(field)?;
        self.orders.push(Order { field, direction });
        Ok(self)
    }

    // ---- paging -------------------------------------------------------------

    /// Skip the first `first_result` rows, 0 for none
    pub fn set_first_result(mut self, first_result: i64) -> Result<Self> {
        self.first_result = non_negative("first result", first_result)?;
        Ok(self)
    }

    /// Return at most `max_rows` rows, 0 for unbounded
    pub fn set_max_rows(mut self, max_rows: i64) -> Result<Self> {
        self.max_rows = non_negative("max rows", max_rows)?;
        Ok(self)
    }

    // ---- execution ----------------------------------------------------------

    fn finish(&self, mut plan: CriteriaPlan) -> CriteriaPlan {
        if let Some(restriction) = &self.restriction {
            restriction.pre_execute(&mut plan);
        }
        plan
    }

    fn entity_plan(&self) -> CriteriaPlan {
        let mut plan = self.plan();
        plan.distinct_root = true;
        let plan = self.finish(plan);
        log::debug!("Executing criteria: {}", plan);
        plan
    }

    fn aggregate(&self, projection: Projection) -> Result<Value> {
        let mut plan = self.plan();
        plan.orders.clear();
        plan.first_result = 0;
        plan.max_rows = 0;
        plan.projection = Some(projection);
        let plan = self.finish(plan);
        log::debug!("Executing criteria: {}", plan);
        self.session.scalar(&plan)
    }

    /// Execute and return every matching entity, once per root entity
    pub fn find_list(&self) -> Result<Vec<T>> {
        let plan = self.entity_plan();
        let rows = self.session.list(&plan)?;

        let id_field = &T::schema().id_field;
        let mut seen = HashSet::with_capacity(rows.len());
        rows.iter()
            .filter(|row| seen.insert(row.get(id_field).clone()))
            .map(T::from_record)
            .collect()
    }

    /// Execute and return the single matching entity, if any.
    ///
    /// More than one match is reported by the session as [`Error::NonUniqueResult`].
    pub fn find_unique(&self) -> Result<Option<T>> {
        let plan = self.entity_plan();
        self.session
            .unique(&plan)?
            .as_ref()
            .map(T::from_record)
            .transpose()
    }

    /// Execute one page (1-based) of the result.
    ///
    /// The paging bounds of the builder are reset to unbounded afterwards, also when the
    /// execution fails.
    pub fn find_page(&mut self, page: i64, page_size: i64) -> Result<Vec<T>> {
        if page < 1 {
            return Err(Error::InvalidArgument(format!(
                "Page numbers start at 1, got {}",
                page
            )));
        }
        if page_size < 1 {
            return Err(Error::InvalidArgument(format!(
                "Page size must be positive, got {}",
                page_size
            )));
        }
        let offset = (page - 1)
            .checked_mul(page_size)
            .ok_or_else(|| Error::InvalidArgument(format!("Page {} is out of range", page)))?;

        self.first_result = non_negative("first result", offset)?;
        self.max_rows = non_negative("max rows", page_size)?;
        let result = self.find_list();
        self.first_result = 0;
        self.max_rows = 0;
        result
    }

    /// Number of result rows; rows fanned out by joins are counted individually
    pub fn find_row_count(&self) -> Result<u64> {
        self.ensure_unordered()?;
        count(self.aggregate(Projection::RowCount)?)
    }

    /// Number of distinct non-null values of `field` among the result rows
    pub fn find_distinct_row_count(&self, field: &str) -> Result<u64> {
        self.ensure_unordered()?;
        let field = self.aliases.alialize(field)?;
        count(self.aggregate(Projection::CountDistinct(field))?)
    }

    /// Largest value of an integer field, 0 when no row matches
    pub fn find_max_value(&self, field: &str) -> Result<i64> {
        let field = self.aliases.alialize(field)?;
        match self.aggregate(Projection::Max(field.clone()))? {
            Value::Null => Ok(0),
            Value::Integer(n) => Ok(n),
            other => Err(Error::Mapping(format!(
                "Maximum of {} is a {}, expected an Integer",
                field,
                other.type_name()
            ))),
        }
    }

    fn ensure_unordered(&self) -> Result<()> {
        if self.has_ordering() {
            return Err(Error::InvalidState(
                "Row counts cannot be computed for an ordered query".to_string(),
            ));
        }
        Ok(())
    }

    /// Restrict to the entity with identity `id` and return it
    pub fn by_id(self, id: impl Into<Value>) -> Result<Option<T>> {
        let id_field = T::schema().id_field.as_str();
        self.eq(id_field, id)?.find_unique()
    }

    /// Restrict to the entity whose natural id `field` equals `value` and return it
    pub fn by_natural_id(self, field: &str, value: impl Into<Value>) -> Result<Option<T>> {
        let schema = T::schema();
        if !schema.natural_id.is_empty() && !schema.is_natural_id(field) {
            return Err(Error::InvalidArgument(format!(
                "{} is not a natural id of {}",
                field, schema.name
            )));
        }
        self.eq(field, value)?.find_unique()
    }

    /// Stream the result page by page, starting at the first page
    pub fn find_paged_iterator(&self, page_size: i64) -> Result<PagedResultIterator<T>> {
        PagedResultIterator::new(self.clone(), 1, page_size)
    }

    /// Stream the result page by page, starting at `start_page` (1-based)
    pub fn find_paged_iterator_from(
        &self,
        start_page: i64,
        page_size: i64,
    ) -> Result<PagedResultIterator<T>> {
        PagedResultIterator::new(self.clone(), start_page, page_size)
    }
}

fn non_negative(what: &str, n: i64) -> Result<usize> {
    usize::try_from(n)
        .map_err(|_| Error::InvalidArgument(format!("{} must not be negative, got {}", what, n)))
}

fn count(value: Value) -> Result<u64> {
    match value {
        Value::Null => Ok(0),
        Value::Integer(n) => u64::try_from(n)
            .map_err(|_| Error::Mapping(format!("Negative row count {}", n))),
        other => Err(Error::Mapping(format!(
            "Row count is a {}, expected an Integer",
            other.type_name()
        ))),
    }
}

impl<T: Entity> Clone for CriteriaBuilder<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            aliases: self.aliases.clone(),
            joins: self.joins.clone(),
            predicates: self.predicates.clone(),
            orders: self.orders.clone(),
            first_result: self.first_result,
            max_rows: self.max_rows,
            max_in_size: self.max_in_size,
            restriction: self.restriction.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> fmt::Debug for CriteriaBuilder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CriteriaBuilder")
            .field("entity", &T::schema().name)
            .field("alias_index", &self.aliases.index())
            .field("joins", &self.joins)
            .field("predicates", &self.predicates)
            .field("orders", &self.orders)
            .field("first_result", &self.first_result)
            .field("max_rows", &self.max_rows)
            .finish()
    }
}
