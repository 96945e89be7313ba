// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CriteriaLite - fluent criteria queries and explicit-commit units of work
//!
//! CriteriaLite sits between application code and a relational store.
//!
//! # Features
//!
//! - **Criteria builder**: chainable restrictions over dotted association paths, joins,
//!   sub-queries and automatically batched membership lists
//! - **Paged streaming**: iterate large results one page round trip at a time
//! - **Finders**: per-entity query factories with pluggable restriction hooks
//! - **Explicit commit**: units of work roll back unless the work marks itself dirty
//! - **In-memory store**: a bundled store evaluating criteria plans, for tests and
//!   embedded use
//!
//! # Usage
//!
//! ```ignore
//! let manager = TransactionManager::new(Arc::new(store));
//! manager.with_tx(|uow| {
//!     let mut task = uow.query::<Task>()?.eq("name", "Task 1")?.find_unique()?.unwrap();
//!     task.done = Some(true);
//!     uow.update(&task)?;
//!     uow.mark_dirty();
//!     Ok::<_, criterialite::Error>(())
//! })?;
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod query;
pub mod schema;
pub mod session;
pub mod storage;
pub mod txn;
pub mod types;

pub use config::CriteriaConfig;
pub use error::{Error, Result};
pub use query::{
    AliasAllocator, BatchSplitter, CriteriaBuilder, CriteriaPlan, Finder, PagedResultIterator,
    Predicate, QueryRestriction, RestrictionRegistry,
};
pub use schema::{Entity, EntitySchema, FieldType, IdGeneration, SchemaRegistry};
pub use session::{PersistenceSession, SessionFactory, SessionTransaction};
pub use storage::MemoryStore;
pub use txn::{TransactionManager, TxOptions, TxState, UnitOfWork};
pub use types::{Record, Value};

/// CriteriaLite version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// CriteriaLite crate name
pub const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
