// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Persistence session abstraction
//!
//! The query and unit-of-work layers never look inside a session. Anything that can
//! execute a [`CriteriaPlan`], run a transaction and manage entity rows can stand behind
//! these traits; `MemoryStore` is the in-process implementation shipped with the crate.

use crate::error::Result;
use crate::query::CriteriaPlan;
use crate::types::{Record, Value};
use std::sync::Arc;

/// Transaction handle of a session
pub trait SessionTransaction: Send + Sync {
    /// Begin a transaction; fails if one is already active
    fn begin(&self) -> Result<()>;

    /// Make all writes since `begin` durable
    fn commit(&self) -> Result<()>;

    /// Discard all writes since `begin`
    fn rollback(&self) -> Result<()>;

    fn is_active(&self) -> bool;

    /// Whether an inner failure has doomed the active transaction
    fn is_rollback_only(&self) -> bool;

    fn set_rollback_only(&self);
}

/// A persistence session bound to one unit of work
///
/// Sessions are shared as `Arc<dyn PersistenceSession>` between the unit of work and the
/// builders created inside it, but they are used from one logical task at a time.
pub trait PersistenceSession: Send + Sync {
    /// Unique session identifier
    fn id(&self) -> &str;

    /// Execute a plan and return the matching root rows
    ///
    /// # Arguments
    /// * `plan` - Alias-resolved criteria with paging bounds applied
    ///
    /// # Returns
    /// * `Ok(rows)` - Root entity rows, one per root when `plan.distinct_root` is set
    /// * `Err(Error::Session)` - If the plan references unknown entities or properties
    fn list(&self, plan: &CriteriaPlan) -> Result<Vec<Record>>;

    /// Execute a plan that is expected to match at most one root entity
    ///
    /// # Returns
    /// * `Ok(None)` - No row matched
    /// * `Ok(Some(row))` - Exactly one row matched
    /// * `Err(Error::NonUniqueResult)` - More than one row matched
    fn unique(&self, plan: &CriteriaPlan) -> Result<Option<Record>>;

    /// Execute an aggregate projection; returns `Value::Null` when nothing matched
    fn scalar(&self, plan: &CriteriaPlan) -> Result<Value>;

    fn transaction(&self) -> &dyn SessionTransaction;

    /// Whether the row `(entity, id)` is managed by this session
    fn contains(&self, entity: &str, id: &Value) -> bool;

    /// Insert a new row and return it with any generated id filled in
    fn persist(&self, entity: &str, record: Record) -> Result<Record>;

    /// Overwrite an existing row
    fn merge(&self, entity: &str, record: Record) -> Result<Record>;

    fn remove(&self, entity: &str, id: &Value) -> Result<()>;

    /// Re-read a row as this session currently sees it
    fn refresh(&self, entity: &str, id: &Value) -> Result<Record>;

    /// Release the session; an active transaction is rolled back
    fn close(&self) -> Result<()>;

    fn is_open(&self) -> bool;
}

/// Source of sessions for named persistence units
pub trait SessionFactory: Send + Sync {
    /// Open a new session for `unit`
    ///
    /// # Returns
    /// * `Ok(session)` - An open session without an active transaction
    /// * `Err(Error::Session)` - If the unit is unknown
    fn open_session(&self, unit: &str) -> Result<Arc<dyn PersistenceSession>>;
}
