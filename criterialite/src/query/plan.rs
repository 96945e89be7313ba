// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Executable criteria plan handed to the persistence session
//!
//! A plan is the fully alias-resolved form of a builder: field references either name a
//! root field (`priority`), a joined alias (`creator_12`), or a field of a joined alias
//! (`creator_12.name`). Join paths are written the same way, relative to the root or to
//! an earlier alias.

use super::predicate::Predicate;
use std::fmt;

/// Name the root entity is bound to while a plan executes
pub const ROOT_ALIAS: &str = "this";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    LeftOuter,
}

/// Association join binding `path` to `alias`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    pub path: String,
    pub alias: String,
    pub kind: JoinKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub field: String,
    pub direction: SortDirection,
}

/// What a plan returns instead of root entities
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Number of (joined) result rows
    RowCount,
    /// Number of distinct non-null values of a field
    CountDistinct(String),
    /// Largest value of a field
    Max(String),
    /// Column of a field, used by sub-queries
    Property(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaPlan {
    pub entity: String,
    pub joins: Vec<Join>,
    pub predicates: Vec<Predicate>,
    pub orders: Vec<Order>,
    pub projection: Option<Projection>,
    /// Rows to skip, 0 = none
    pub first_result: usize,
    /// Row limit, 0 = unbounded
    pub max_rows: usize,
    /// Collapse rows fanned out by joins to one row per root entity
    pub distinct_root: bool,
}

impl CriteriaPlan {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            joins: Vec::new(),
            predicates: Vec::new(),
            orders: Vec::new(),
            projection: None,
            first_result: 0,
            max_rows: 0,
            distinct_root: false,
        }
    }

    pub fn is_paged(&self) -> bool {
        self.first_result > 0 || self.max_rows > 0
    }

    pub fn join_for_alias(&self, alias: &str) -> Option<&Join> {
        self.joins.iter().find(|j| j.alias == alias)
    }
}

impl fmt::Display for CriteriaPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select ")?;
        match &self.projection {
            None if self.distinct_root => write!(f, "distinct {}", ROOT_ALIAS)?,
            None => write!(f, "{}", ROOT_ALIAS)?,
            Some(Projection::RowCount) => write!(f, "count(*)")?,
            Some(Projection::CountDistinct(field)) => write!(f, "count(distinct {})", field)?,
            Some(Projection::Max(field)) => write!(f, "max({})", field)?,
            Some(Projection::Property(field)) => write!(f, "{}", field)?,
        }
        write!(f, " from {} {}", self.entity, ROOT_ALIAS)?;

        for join in &self.joins {
            let keyword = match join.kind {
                JoinKind::Inner => "join",
                JoinKind::LeftOuter => "left join",
            };
            write!(f, " {} {} {}", keyword, join.path, join.alias)?;
        }

        for (i, predicate) in self.predicates.iter().enumerate() {
            let keyword = if i == 0 { "where" } else { "and" };
            write!(f, " {} {}", keyword, predicate)?;
        }

        for (i, order) in self.orders.iter().enumerate() {
            let keyword = if i == 0 { " order by" } else { "," };
            let direction = match order.direction {
                SortDirection::Asc => "asc",
                SortDirection::Desc => "desc",
            };
            write!(f, "{} {} {}", keyword, order.field, direction)?;
        }

        if self.max_rows > 0 {
            write!(f, " limit {}", self.max_rows)?;
        }
        if self.first_result > 0 {
            write!(f, " offset {}", self.first_result)?;
        }
        Ok(())
    }
}
