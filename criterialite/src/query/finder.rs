// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Per-entity query factory and restriction hooks
//!
//! A [`Finder`] hands out fresh builders for one entity type. When a
//! [`QueryRestriction`] is registered for the type, every builder passes through
//! [`QueryRestriction::prepare_query`] exactly once before the caller sees it, which is
//! where visibility or tenant filters belong.

use super::builder::CriteriaBuilder;
use super::batch::MAX_IN_SIZE;
use super::plan::CriteriaPlan;
use crate::error::Result;
use crate::schema::Entity;
use crate::session::PersistenceSession;
use crate::types::Value;
use parking_lot::RwLock;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

/// Query-restriction capability of an entity type
pub trait QueryRestriction<T: Entity>: Send + Sync {
    /// Add default restrictions to a freshly created builder
    fn prepare_query(&self, query: CriteriaBuilder<T>) -> Result<CriteriaBuilder<T>>;

    /// Inspect or adjust the final plan right before it is handed to the session
    fn pre_execute(&self, _plan: &mut CriteriaPlan) {}
}

/// Factory of builders for entity type `T`
pub struct Finder<T: Entity> {
    session: Arc<dyn PersistenceSession>,
    restriction: Option<Arc<dyn QueryRestriction<T>>>,
    max_in_size: usize,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Finder<T> {
    pub fn new(session: Arc<dyn PersistenceSession>) -> Self {
        Self {
            session,
            restriction: None,
            max_in_size: MAX_IN_SIZE,
            _entity: PhantomData,
        }
    }

    pub fn with_restriction(mut self, restriction: Arc<dyn QueryRestriction<T>>) -> Self {
        self.restriction = Some(restriction);
        self
    }

    pub fn with_max_in_size(mut self, max_in_size: usize) -> Self {
        self.max_in_size = max_in_size;
        self
    }

    pub fn has_restriction(&self) -> bool {
        self.restriction.is_some()
    }

    /// Create a new builder, passed through the registered restriction if there is one
    pub fn query(&self) -> Result<CriteriaBuilder<T>> {
        let query =
            CriteriaBuilder::new(Arc::clone(&self.session)).with_max_in_size(self.max_in_size);
        match &self.restriction {
            Some(restriction) => {
                restriction.prepare_query(query.with_restriction(Arc::clone(restriction)))
            }
            None => Ok(query),
        }
    }

    pub fn all(&self) -> Result<Vec<T>> {
        self.query()?.find_list()
    }

    /// Any single entity, or `None` if there is none
    pub fn first(&self) -> Result<Option<T>> {
        self.query()?.set_max_rows(1)?.find_unique()
    }

    pub fn count(&self) -> Result<u64> {
        self.query()?.find_row_count()
    }

    pub fn by_id(&self, id: impl Into<Value>) -> Result<Option<T>> {
        self.query()?.by_id(id)
    }
}

impl<T: Entity> Clone for Finder<T> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            restriction: self.restriction.clone(),
            max_in_size: self.max_in_size,
            _entity: PhantomData,
        }
    }
}

/// Restriction hooks keyed by entity type
#[derive(Default)]
pub struct RestrictionRegistry {
    hooks: RwLock<HashMap<TypeId, Box<dyn Any + Send + Sync>>>,
}

impl RestrictionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the restriction of entity type `T`
    pub fn register<T: Entity>(&self, restriction: Arc<dyn QueryRestriction<T>>) {
        let replaced = self
            .hooks
            .write()
            .insert(TypeId::of::<T>(), Box::new(restriction))
            .is_some();
        if replaced {
            log::warn!("Replaced query restriction of {}", T::schema().name);
        } else {
            log::debug!("Registered query restriction of {}", T::schema().name);
        }
    }

    pub fn get<T: Entity>(&self) -> Option<Arc<dyn QueryRestriction<T>>> {
        self.hooks
            .read()
            .get(&TypeId::of::<T>())
            .and_then(|hook| hook.downcast_ref::<Arc<dyn QueryRestriction<T>>>())
            .cloned()
    }

    pub fn contains<T: Entity>(&self) -> bool {
        self.hooks.read().contains_key(&TypeId::of::<T>())
    }

    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }

    /// Finder for `T` on `session`, carrying the restriction registered for `T`
    pub fn finder<T: Entity>(
        &self,
        session: Arc<dyn PersistenceSession>,
        max_in_size: usize,
    ) -> Finder<T> {
        let finder = Finder::new(session).with_max_in_size(max_in_size);
        match self.get::<T>() {
            Some(restriction) => finder.with_restriction(restriction),
            None => finder,
        }
    }
}
