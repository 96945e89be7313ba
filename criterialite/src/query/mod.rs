// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Criteria queries
//!
//! [`CriteriaBuilder`] accumulates restrictions, joins, ordering and paging for one
//! root entity and compiles them into a backend-neutral [`CriteriaPlan`]. Association
//! paths in field names are rewritten to join aliases by an [`AliasAllocator`], and large
//! membership lists are split by a [`BatchSplitter`].

pub mod alias;
pub mod batch;
pub mod builder;
pub mod finder;
pub mod paged;
pub mod plan;
pub mod predicate;

pub use alias::{AliasAllocator, MAX_ALIAS_INDEX, PATH_SEPARATOR};
pub use batch::{BatchSplitter, MAX_IN_SIZE};
pub use builder::CriteriaBuilder;
pub use finder::{Finder, QueryRestriction, RestrictionRegistry};
pub use paged::PagedResultIterator;
pub use plan::{CriteriaPlan, Join, JoinKind, Order, Projection, SortDirection, ROOT_ALIAS};
pub use predicate::{CompareOp, Predicate};
