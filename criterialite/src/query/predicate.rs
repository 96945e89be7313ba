// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Predicate tree of a criteria query
//!
//! Predicates are built with the constructors on [`Predicate`] (for `or`/`and` groups) or
//! through the builder methods on `CriteriaBuilder`. Field names inside a predicate may be
//! dotted association paths; the builder rewrites them to alias form before the predicate
//! becomes part of an executable plan.

use super::plan::CriteriaPlan;
use crate::error::{Error, Result};
use crate::types::Value;
use std::cmp::Ordering;
use std::fmt;

/// Binary comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    /// Whether an ordering of `left` relative to `right` satisfies this operator
    pub fn matches(&self, ordering: Ordering) -> bool {
        match self {
            CompareOp::Eq => ordering == Ordering::Equal,
            CompareOp::Ne => ordering != Ordering::Equal,
            CompareOp::Gt => ordering == Ordering::Greater,
            CompareOp::Ge => ordering != Ordering::Less,
            CompareOp::Lt => ordering == Ordering::Less,
            CompareOp::Le => ordering != Ordering::Greater,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field <op> value`
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    /// `left <op> right` between two fields
    CompareProperty {
        left: String,
        op: CompareOp,
        right: String,
    },
    /// Case-insensitive equality
    IEq { field: String, value: String },
    /// Case-insensitive pattern match with `%` and `_` wildcards
    ILike { field: String, pattern: String },
    /// Inclusive range
    Between {
        field: String,
        low: Value,
        high: Value,
    },
    IsNull { field: String },
    IsNotNull { field: String },
    /// Membership in a literal value list
    In { field: String, values: Vec<Value> },
    /// Membership in the projected column of another query
    InSubquery {
        field: String,
        subquery: Box<CriteriaPlan>,
        negated: bool,
    },
    Not(Box<Predicate>),
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
}

impl Predicate {
    fn compare(field: &str, op: CompareOp, value: impl Into<Value>) -> Self {
        Predicate::Compare {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    fn compare_property(left: &str, op: CompareOp, right: &str) -> Self {
        Predicate::CompareProperty {
            left: left.to_string(),
            op,
            right: right.to_string(),
        }
    }

    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn gt(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn ge(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ge, value)
    }

    pub fn lt(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn le(field: &str, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Le, value)
    }

    pub fn eq_property(left: &str, right: &str) -> Self {
        Self::compare_property(left, CompareOp::Eq, right)
    }

    pub fn ne_property(left: &str, right: &str) -> Self {
        Self::compare_property(left, CompareOp::Ne, right)
    }

    pub fn gt_property(left: &str, right: &str) -> Self {
        Self::compare_property(left, CompareOp::Gt, right)
    }

    pub fn ge_property(left: &str, right: &str) -> Self {
        Self::compare_property(left, CompareOp::Ge, right)
    }

    pub fn lt_property(left: &str, right: &str) -> Self {
        Self::compare_property(left, CompareOp::Lt, right)
    }

    pub fn le_property(left: &str, right: &str) -> Self {
        Self::compare_property(left, CompareOp::Le, right)
    }

    pub fn ieq(field: &str, value: impl Into<String>) -> Self {
        Predicate::IEq {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn ilike(field: &str, pattern: impl Into<String>) -> Self {
        Predicate::ILike {
            field: field.to_string(),
            pattern: pattern.into(),
        }
    }

    pub fn between(field: &str, low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Predicate::Between {
            field: field.to_string(),
            low: low.into(),
            high: high.into(),
        }
    }

    pub fn is_null(field: &str) -> Self {
        Predicate::IsNull {
            field: field.to_string(),
        }
    }

    pub fn is_not_null(field: &str) -> Self {
        Predicate::IsNotNull {
            field: field.to_string(),
        }
    }

    /// Membership predicate without batching; an empty list is rejected once the
    /// predicate is added to a builder
    pub fn is_in<V: Into<Value>>(field: &str, values: impl IntoIterator<Item = V>) -> Self {
        Predicate::In {
            field: field.to_string(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn not(predicate: Predicate) -> Self {
        Predicate::Not(Box::new(predicate))
    }

    pub fn and(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::And(predicates.into_iter().collect())
    }

    pub fn or(predicates: impl IntoIterator<Item = Predicate>) -> Self {
        Predicate::Or(predicates.into_iter().collect())
    }

    /// Reject membership predicates without values anywhere in the tree
    pub fn validate(&self) -> Result<()> {
        match self {
            Predicate::In { field, values } if values.is_empty() => Err(Error::InvalidArgument(
                format!("Empty value list for membership test on {}", field),
            )),
            Predicate::Not(inner) => inner.validate(),
            Predicate::And(children) | Predicate::Or(children) => {
                children.iter().try_for_each(Predicate::validate)
            }
            _ => Ok(()),
        }
    }

    /// Rewrite every field reference of this tree with `map`.
    ///
    /// Sub-query plans are left untouched: their fields live in the sub-query's own
    /// alias namespace and were resolved when the sub-query was attached.
    pub fn try_map_fields<F>(self, map: &mut F) -> Result<Predicate>
    where
        F: FnMut(&str) -> Result<String>,
    {
        Ok(match self {
            Predicate::Compare { field, op, value } => Predicate::Compare {
                field: map(&field)?,
                op,
                value,
            },
            Predicate::CompareProperty { left, op, right } => Predicate::CompareProperty {
                left: map(&left)?,
                op,
                right: map(&right)?,
            },
            Predicate::IEq { field, value } => Predicate::IEq {
                field: map(&field)?,
                value,
            },
            Predicate::ILike { field, pattern } => Predicate::ILike {
                field: map(&field)?,
                pattern,
            },
            Predicate::Between { field, low, high } => Predicate::Between {
                field: map(&field)?,
                low,
                high,
            },
            Predicate::IsNull { field } => Predicate::IsNull {
                field: map(&field)?,
            },
            Predicate::IsNotNull { field } => Predicate::IsNotNull {
                field: map(&field)?,
            },
            Predicate::In { field, values } => Predicate::In {
                field: map(&field)?,
                values,
            },
            Predicate::InSubquery {
                field,
                subquery,
                negated,
            } => Predicate::InSubquery {
                field: map(&field)?,
                subquery,
                negated,
            },
            Predicate::Not(inner) => Predicate::Not(Box::new(inner.try_map_fields(map)?)),
            Predicate::And(children) => Predicate::And(
                children
                    .into_iter()
                    .map(|p| p.try_map_fields(map))
                    .collect::<Result<_>>()?,
            ),
            Predicate::Or(children) => Predicate::Or(
                children
                    .into_iter()
                    .map(|p| p.try_map_fields(map))
                    .collect::<Result<_>>()?,
            ),
        })
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    children: &[Predicate],
    separator: &str,
) -> fmt::Result {
    write!(f, "(")?;
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            write!(f, " {} ", separator)?;
        }
        write!(f, "{}", child)?;
    }
    write!(f, ")")
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Compare { field, op, value } => {
                write!(f, "{} {} {}", field, op.symbol(), value)
            }
            Predicate::CompareProperty { left, op, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Predicate::IEq { field, value } => {
                write!(f, "lower({}) = {}", field, Value::from(value.to_lowercase()))
            }
            Predicate::ILike { field, pattern } => {
                write!(f, "lower({}) like {}", field, Value::from(pattern.to_lowercase()))
            }
            Predicate::Between { field, low, high } => {
                write!(f, "{} between {} and {}", field, low, high)
            }
            Predicate::IsNull { field } => write!(f, "{} is null", field),
            Predicate::IsNotNull { field } => write!(f, "{} is not null", field),
            Predicate::In { field, values } => {
                write!(f, "{} in (", field)?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, ")")
            }
            Predicate::InSubquery {
                field,
                subquery,
                negated,
            } => {
                let keyword = if *negated { "not in" } else { "in" };
                write!(f, "{} {} ({})", field, keyword, subquery)
            }
            Predicate::Not(inner) => write!(f, "not ({})", inner),
            Predicate::And(children) => write_joined(f, children, "and"),
            Predicate::Or(children) => write_joined(f, children, "or"),
        }
    }
}
