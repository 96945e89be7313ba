// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Criteria plan evaluation over in-memory tables
//!
//! Execution happens in three steps:
//! 1. Bind: the root table is joined along the plan's joins, producing one tuple of
//!    bindings per result row (a left join without match binds nothing)
//! 2. Filter: predicates are evaluated with SQL three-valued logic, only rows where every
//!    predicate is true survive
//! 3. Shape: ordering, root de-duplication and paging, or an aggregate projection

use crate::error::{Error, Result};
use crate::query::plan::{CriteriaPlan, JoinKind, Projection, SortDirection, ROOT_ALIAS};
use crate::query::predicate::{CompareOp, Predicate};
use crate::schema::{AssociationKind, EntitySchema, SchemaRegistry};
use crate::types::{Record, Value};
use regex::Regex;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Rows per entity name
pub(crate) type Tables = HashMap<String, Vec<Record>>;

static NULL: Value = Value::Null;

/// Result of executing a plan
#[derive(Debug)]
pub(crate) enum Output {
    Rows(Vec<Record>),
    Scalar(Value),
    Column(Vec<Value>),
}

/// Execute `plan` against `tables`
pub(crate) fn execute(
    schema: &SchemaRegistry,
    tables: &Tables,
    plan: &CriteriaPlan,
) -> Result<Output> {
    let scope = Scope::bind(schema, plan)?;
    let conditions = plan
        .predicates
        .iter()
        .map(|p| compile(&scope, schema, tables, p))
        .collect::<Result<Vec<_>>>()?;
    let orders = plan
        .orders
        .iter()
        .map(|o| -> Result<(FieldRef, SortDirection)> {
            Ok((scope.resolve(&o.field)?, o.direction))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut tuples = scope.expand(tables)?;
    tuples.retain(|tuple| conditions.iter().all(|c| c.eval(tuple) == Some(true)));

    let projection = match &plan.projection {
        Some(projection) => projection,
        None => {
            sort(&mut tuples, &orders);
            if plan.distinct_root {
                let id_field = &scope.slots[0].schema.id_field;
                let mut seen = HashSet::with_capacity(tuples.len());
                tuples.retain(|tuple| {
                    tuple[0].map_or(true, |root| seen.insert(root.get(id_field).clone()))
                });
            }
            let rows = page(tuples, plan)
                .into_iter()
                .filter_map(|tuple| tuple[0].cloned())
                .collect();
            return Ok(Output::Rows(rows));
        }
    };

    match projection {
        Projection::RowCount => Ok(Output::Scalar(Value::Integer(tuples.len() as i64))),
        Projection::CountDistinct(field) => {
            let field = scope.resolve(field)?;
            let distinct: HashSet<&Value> = tuples
                .iter()
                .map(|tuple| field.value(tuple))
                .filter(|v| !v.is_null())
                .collect();
            Ok(Output::Scalar(Value::Integer(distinct.len() as i64)))
        }
        Projection::Max(field) => {
            let field = scope.resolve(field)?;
            let max = tuples
                .iter()
                .map(|tuple| field.value(tuple))
                .filter(|v| !v.is_null())
                .fold(None::<&Value>, |max, v| match max {
                    Some(m) if m.compare(v) != Some(Ordering::Less) => Some(m),
                    _ => Some(v),
                });
            Ok(Output::Scalar(max.cloned().unwrap_or(Value::Null)))
        }
        Projection::Property(field) => {
            let field = scope.resolve(field)?;
            sort(&mut tuples, &orders);
            let column = page(tuples, plan)
                .iter()
                .map(|tuple| field.value(tuple).clone())
                .collect();
            Ok(Output::Column(column))
        }
    }
}

type Tuple<'t> = Vec<Option<&'t Record>>;

struct Slot<'s> {
    alias: &'s str,
    schema: &'s EntitySchema,
}

struct JoinStep<'s> {
    source: usize,
    kind: JoinKind,
    association: &'s AssociationKind,
    source_schema: &'s EntitySchema,
    target_schema: &'s EntitySchema,
}

/// Alias bindings of one plan
struct Scope<'s> {
    slots: Vec<Slot<'s>>,
    joins: Vec<JoinStep<'s>>,
}

/// A resolved field reference: binding slot plus field name
#[derive(Debug, Clone)]
struct FieldRef {
    slot: usize,
    field: String,
}

impl FieldRef {
    fn value<'t>(&self, tuple: &[Option<&'t Record>]) -> &'t Value {
        match tuple.get(self.slot).copied().flatten() {
            Some(record) => record.get(&self.field),
            None => &NULL,
        }
    }
}

impl<'s> Scope<'s> {
    fn bind(schema: &'s SchemaRegistry, plan: &'s CriteriaPlan) -> Result<Self> {
        let root = schema
            .get(&plan.entity)
            .map_err(|_| Error::Session(format!("Unknown entity {}", plan.entity)))?;
        let mut scope = Scope {
            slots: vec![Slot {
                alias: ROOT_ALIAS,
                schema: root,
            }],
            joins: Vec::with_capacity(plan.joins.len()),
        };

        for join in &plan.joins {
            let (source, name) = match join.path.split_once('.') {
                Some((alias, name)) => {
                    let source = scope.slot(alias).ok_or_else(|| {
                        Error::Session(format!("Unknown alias {} in join {}", alias, join.path))
                    })?;
                    (source, name)
                }
                None => (0, join.path.as_str()),
            };
            let source_schema = scope.slots[source].schema;
            let association = source_schema.association(name).ok_or_else(|| {
                Error::Session(format!(
                    "Unknown association {} of {}",
                    name, source_schema.name
                ))
            })?;
            let target_schema = schema.get(&association.target)?;
            if scope.slot(&join.alias).is_some() {
                return Err(Error::Session(format!("Duplicate alias {}", join.alias)));
            }

            scope.slots.push(Slot {
                alias: &join.alias,
                schema: target_schema,
            });
            scope.joins.push(JoinStep {
                source,
                kind: join.kind,
                association: &association.kind,
                source_schema,
                target_schema,
            });
        }
        Ok(scope)
    }

    fn slot(&self, alias: &str) -> Option<usize> {
        self.slots.iter().position(|s| s.alias == alias)
    }

    /// Resolve `field`, `alias.field` or a bare join alias (which stands for the joined id)
    fn resolve(&self, field: &str) -> Result<FieldRef> {
        if let Some((alias, name)) = field.split_once('.') {
            let slot = self
                .slot(alias)
                .ok_or_else(|| Error::Session(format!("Unknown alias {} in {}", alias, field)))?;
            let schema = self.slots[slot].schema;
            if schema.field(name).is_none() {
                return Err(Error::Session(format!(
                    "Unknown property {} of {}",
                    name, schema.name
                )));
            }
            return Ok(FieldRef {
                slot,
                field: name.to_string(),
            });
        }

        let root = self.slots[0].schema;
        if root.field(field).is_some() {
            return Ok(FieldRef {
                slot: 0,
                field: field.to_string(),
            });
        }
        match self.slot(field) {
            Some(slot) => Ok(FieldRef {
                slot,
                field: self.slots[slot].schema.id_field.clone(),
            }),
            None => Err(Error::Session(format!(
                "Unknown property {} of {}",
                field, root.name
            ))),
        }
    }

    fn expand<'t>(&self, tables: &'t Tables) -> Result<Vec<Tuple<'t>>> {
        let mut tuples: Vec<Tuple<'t>> = rows(tables, &self.slots[0].schema.name)
            .iter()
            .map(|row| {
                let mut tuple = Vec::with_capacity(self.slots.len());
                tuple.push(Some(row));
                tuple
            })
            .collect();

        for step in &self.joins {
            let targets = rows(tables, &step.target_schema.name);
            let mut joined = Vec::with_capacity(tuples.len());
            for tuple in tuples {
                let matches: Vec<&'t Record> = match tuple[step.source] {
                    Some(source) => targets
                        .iter()
                        .filter(|target| step.links(source, target))
                        .collect(),
                    None => Vec::new(),
                };
                if matches.is_empty() {
                    if step.kind == JoinKind::LeftOuter {
                        let mut next = tuple;
                        next.push(None);
                        joined.push(next);
                    }
                    continue;
                }
                for target in matches {
                    let mut next = tuple.clone();
                    next.push(Some(target));
                    joined.push(next);
                }
            }
            tuples = joined;
        }
        Ok(tuples)
    }
}

impl JoinStep<'_> {
    fn links(&self, source: &Record, target: &Record) -> bool {
        match self.association {
            AssociationKind::ManyToOne { foreign_key } => {
                let key = source.get(foreign_key);
                !key.is_null() && key == target.get(&self.target_schema.id_field)
            }
            AssociationKind::OneToMany { mapped_by } => {
                let id = source.get(&self.source_schema.id_field);
                !id.is_null() && id == target.get(mapped_by)
            }
        }
    }
}

fn rows<'t>(tables: &'t Tables, entity: &str) -> &'t [Record] {
    tables.get(entity).map(Vec::as_slice).unwrap_or(&[])
}

/// Nulls sort first in ascending order; values of different kinds compare equal
fn sort(tuples: &mut [Tuple<'_>], orders: &[(FieldRef, SortDirection)]) {
    if orders.is_empty() {
        return;
    }
    tuples.sort_by(|a, b| {
        for (field, direction) in orders {
            let (x, y) = (field.value(a), field.value(b));
            let ordering = match (x.is_null(), y.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Less,
                (false, true) => Ordering::Greater,
                (false, false) => x.compare(y).unwrap_or(Ordering::Equal),
            };
            let ordering = match direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn page<'t>(tuples: Vec<Tuple<'t>>, plan: &CriteriaPlan) -> Vec<Tuple<'t>> {
    let limit = if plan.max_rows == 0 {
        usize::MAX
    } else {
        plan.max_rows
    };
    tuples
        .into_iter()
        .skip(plan.first_result)
        .take(limit)
        .collect()
}

/// Predicate with resolved field references
enum Condition {
    Compare(FieldRef, CompareOp, Value),
    CompareFields(FieldRef, CompareOp, FieldRef),
    IEq(FieldRef, String),
    Like(FieldRef, Regex),
    Between(FieldRef, Value, Value),
    IsNull(FieldRef),
    IsNotNull(FieldRef),
    In(FieldRef, Vec<Value>),
    Not(Box<Condition>),
    And(Vec<Condition>),
    Or(Vec<Condition>),
}

fn compile(
    scope: &Scope<'_>,
    schema: &SchemaRegistry,
    tables: &Tables,
    predicate: &Predicate,
) -> Result<Condition> {
    Ok(match predicate {
        Predicate::Compare { field, op, value } => {
            Condition::Compare(scope.resolve(field)?, *op, value.clone())
        }
        Predicate::CompareProperty { left, op, right } => {
            Condition::CompareFields(scope.resolve(left)?, *op, scope.resolve(right)?)
        }
        Predicate::IEq { field, value } => {
            Condition::IEq(scope.resolve(field)?, value.to_lowercase())
        }
        Predicate::ILike { field, pattern } => {
            Condition::Like(scope.resolve(field)?, like_regex(pattern)?)
        }
        Predicate::Between { field, low, high } => {
            Condition::Between(scope.resolve(field)?, low.clone(), high.clone())
        }
        Predicate::IsNull { field } => Condition::IsNull(scope.resolve(field)?),
        Predicate::IsNotNull { field } => Condition::IsNotNull(scope.resolve(field)?),
        Predicate::In { field, values } => Condition::In(scope.resolve(field)?, values.clone()),
        Predicate::InSubquery {
            field,
            subquery,
            negated,
        } => {
            let values = match execute(schema, tables, subquery)? {
                Output::Column(values) => values,
                _ => {
                    return Err(Error::Session(
                        "Sub-query must project a single property".to_string(),
                    ))
                }
            };
            let membership = Condition::In(scope.resolve(field)?, values);
            if *negated {
                Condition::Not(Box::new(membership))
            } else {
                membership
            }
        }
        Predicate::Not(inner) => Condition::Not(Box::new(compile(scope, schema, tables, inner)?)),
        Predicate::And(children) => Condition::And(
            children
                .iter()
                .map(|p| compile(scope, schema, tables, p))
                .collect::<Result<_>>()?,
        ),
        Predicate::Or(children) => Condition::Or(
            children
                .iter()
                .map(|p| compile(scope, schema, tables, p))
                .collect::<Result<_>>()?,
        ),
    })
}

/// Translate a `%`/`_` pattern into an anchored, case-insensitive regex
fn like_regex(pattern: &str) -> Result<Regex> {
    let mut source = String::with_capacity(pattern.len() + 8);
    source.push_str("(?is)^");
    for c in pattern.chars() {
        match c {
            '%' => source.push_str(".*"),
            '_' => source.push('.'),
            c => source.push_str(&regex::escape(c.encode_utf8(&mut [0; 4]))),
        }
    }
    source.push('$');
    Regex::new(&source).map_err(|e| Error::Session(format!("Invalid pattern {}: {}", pattern, e)))
}

impl Condition {
    /// `None` is SQL "unknown"
    fn eval(&self, tuple: &[Option<&Record>]) -> Option<bool> {
        match self {
            Condition::Compare(field, op, value) => {
                field.value(tuple).compare(value).map(|o| op.matches(o))
            }
            Condition::CompareFields(left, op, right) => left
                .value(tuple)
                .compare(right.value(tuple))
                .map(|o| op.matches(o)),
            Condition::IEq(field, value) => field
                .value(tuple)
                .as_string()
                .map(|s| s.to_lowercase() == *value),
            Condition::Like(field, regex) => {
                field.value(tuple).as_string().map(|s| regex.is_match(s))
            }
            Condition::Between(field, low, high) => {
                let value = field.value(tuple);
                and3([
                    value.compare(low).map(|o| o != Ordering::Less),
                    value.compare(high).map(|o| o != Ordering::Greater),
                ])
            }
            Condition::IsNull(field) => Some(field.value(tuple).is_null()),
            Condition::IsNotNull(field) => Some(!field.value(tuple).is_null()),
            Condition::In(field, values) => {
                let value = field.value(tuple);
                if value.is_null() {
                    return None;
                }
                let mut unknown = false;
                for candidate in values {
                    match value.compare(candidate) {
                        Some(Ordering::Equal) => return Some(true),
                        None if candidate.is_null() => unknown = true,
                        _ => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(false)
                }
            }
            Condition::Not(inner) => inner.eval(tuple).map(|b| !b),
            Condition::And(children) => and3(children.iter().map(|c| c.eval(tuple))),
            Condition::Or(children) => {
                let mut unknown = false;
                for child in children {
                    match child.eval(tuple) {
                        Some(true) => return Some(true),
                        None => unknown = true,
                        Some(false) => {}
                    }
                }
                if unknown {
                    None
                } else {
                    Some(false)
                }
            }
        }
    }
}

fn and3(values: impl IntoIterator<Item = Option<bool>>) -> Option<bool> {
    let mut unknown = false;
    for value in values {
        match value {
            Some(false) => return Some(false),
            None => unknown = true,
            Some(true) => {}
        }
    }
    if unknown {
        None
    } else {
        Some(true)
    }
}
