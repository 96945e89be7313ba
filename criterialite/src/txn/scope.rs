// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Unit-of-work scope
//!
//! A [`UnitOfWork`] owns one persistence session for the duration of a piece of work and
//! carries the commit-needed flag. The flag starts cleared; the work has to call
//! [`UnitOfWork::mark_dirty`] for anything to be committed. Dropping the scope always rolls
//! back a still-active transaction and closes the session, also while unwinding.

use super::state::{TxOptions, TxState};
use crate::error::{Error, Result};
use crate::query::{CriteriaBuilder, Finder, RestrictionRegistry};
use crate::schema::Entity;
use crate::session::PersistenceSession;
use std::cell::Cell;
use std::sync::Arc;
use uuid::Uuid;

/// An open session plus the commit decision of the work running in it
///
/// The scope is handed to the work by reference and is neither `Sync` nor shared across
/// units of work.
pub struct UnitOfWork {
    id: String,
    session: Arc<dyn PersistenceSession>,
    options: TxOptions,
    needs_commit: Cell<bool>,
    state: Cell<TxState>,
    restrictions: Arc<RestrictionRegistry>,
    max_in_size: usize,
}

impl UnitOfWork {
    /// Enter a scope on `session`, beginning a transaction unless `options` is read-only
    pub(crate) fn begin(
        session: Arc<dyn PersistenceSession>,
        options: TxOptions,
        restrictions: Arc<RestrictionRegistry>,
        max_in_size: usize,
    ) -> Result<Self> {
        let scope = Self {
            id: Uuid::new_v4().to_string(),
            session,
            options,
            needs_commit: Cell::new(false),
            state: Cell::new(TxState::Idle),
            restrictions,
            max_in_size,
        };
        scope.state.set(TxState::SessionOpen);
        if !scope.options.read_only {
            scope.session.transaction().begin()?;
        }
        log::debug!(
            "Unit of work {} started on session {} (unit {}, read-only: {})",
            scope.id,
            scope.session.id(),
            scope.options.unit,
            scope.options.read_only
        );
        Ok(scope)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn options(&self) -> &TxOptions {
        &self.options
    }

    pub fn state(&self) -> TxState {
        self.state.get()
    }

    pub fn session(&self) -> &Arc<dyn PersistenceSession> {
        &self.session
    }

    /// Request that the work's changes be committed at normal exit
    pub fn mark_dirty(&self) {
        self.needs_commit.set(true);
    }

    pub fn needs_commit(&self) -> bool {
        self.needs_commit.get()
    }

    /// Finder for `T` bound to this unit's session
    pub fn find<T: Entity>(&self) -> Finder<T> {
        self.restrictions
            .finder(Arc::clone(&self.session), self.max_in_size)
    }

    /// Fresh builder for `T`, passed through the restriction registered for `T`
    pub fn query<T: Entity>(&self) -> Result<CriteriaBuilder<T>> {
        self.find::<T>().query()
    }

    /// Persist a new entity; a generated id is written back into `entity`.
    ///
    /// Fails with [`Error::InvalidState`] when the entity is already managed by the session.
    pub fn save<T: Entity>(&self, entity: &mut T) -> Result<()> {
        let schema = T::schema();
        let id = entity.id()?;
        if !id.is_null() && self.session.contains(&schema.name, &id) {
            return Err(Error::InvalidState(format!(
                "{} {} is already managed, use update",
                schema.name, id
            )));
        }
        let stored = self.session.persist(&schema.name, entity.to_record()?)?;
        *entity = T::from_record(&stored)?;
        Ok(())
    }

    /// Write the state of a managed entity back to the session
    pub fn update<T: Entity>(&self, entity: &T) -> Result<()> {
        let schema = T::schema();
        let id = entity.id()?;
        if !self.session.contains(&schema.name, &id) {
            return Err(Error::InvalidState(format!(
                "{} {} is not managed by this unit of work, load or save it first",
                schema.name, id
            )));
        }
        self.session.merge(&schema.name, entity.to_record()?)?;
        Ok(())
    }

    pub fn delete<T: Entity>(&self, entity: &T) -> Result<()> {
        self.session.remove(&T::schema().name, &entity.id()?)
    }

    /// Reload `entity` from the session's view of the store
    pub fn refresh<T: Entity>(&self, entity: &mut T) -> Result<()> {
        let record = self.session.refresh(&T::schema().name, &entity.id()?)?;
        *entity = T::from_record(&record)?;
        Ok(())
    }

    pub fn contains<T: Entity>(&self, entity: &T) -> Result<bool> {
        Ok(self.session.contains(&T::schema().name, &entity.id()?))
    }

    /// Normal exit: commit if the work asked for it and nothing forced a rollback
    pub(crate) fn complete(&self) -> Result<()> {
        let tx = self.session.transaction();
        if !tx.is_active() {
            self.state.set(TxState::RolledBack);
            return Ok(());
        }

        if self.needs_commit() && !tx.is_rollback_only() {
            let result = tx.commit();
            self.state.set(if result.is_ok() {
                TxState::Committed
            } else {
                TxState::RolledBack
            });
            result?;
            log::info!("Unit of work {} committed", self.id);
        } else {
            if self.needs_commit() {
                log::warn!(
                    "Unit of work {} asked to commit but its transaction is rollback-only",
                    self.id
                );
            }
            tx.rollback()?;
            self.state.set(TxState::RolledBack);
            log::debug!("Unit of work {} rolled back", self.id);
        }
        Ok(())
    }

    /// Exceptional exit: roll back, logging instead of raising rollback failures
    pub(crate) fn abort(&self) {
        let tx = self.session.transaction();
        if tx.is_active() {
            if let Err(e) = tx.rollback() {
                log::error!("Rollback of unit of work {} failed: {}", self.id, e);
            }
        }
        self.state.set(TxState::RolledBack);
        log::debug!("Unit of work {} aborted", self.id);
    }
}

impl Drop for UnitOfWork {
    fn drop(&mut self) {
        self.needs_commit.set(false);
        if self.session.transaction().is_active() {
            if std::thread::panicking() {
                log::error!("Unit of work {} panicked, rolling back", self.id);
            }
            self.abort();
        }
        if let Err(e) = self.session.close() {
            log::error!("Closing session of unit of work {} failed: {}", self.id, e);
        }
        self.state.set(TxState::Closed);
    }
}
