// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Transaction manager
//!
//! Runs units of work: open a session, begin a transaction, run the work, then commit
//! only if the work marked itself dirty. Sessions are always released.

use super::scope::UnitOfWork;
use super::state::TxOptions;
use crate::config::CriteriaConfig;
use crate::error::{Error, Result};
use crate::query::{QueryRestriction, RestrictionRegistry};
use crate::schema::Entity;
use crate::session::{PersistenceSession, SessionFactory};
use std::sync::Arc;

/// Entry point for transactional work against a [`SessionFactory`]
#[derive(Clone)]
pub struct TransactionManager {
    factory: Arc<dyn SessionFactory>,
    config: Arc<CriteriaConfig>,
    restrictions: Arc<RestrictionRegistry>,
}

impl TransactionManager {
    /// Create a manager with the default configuration
    pub fn new(factory: Arc<dyn SessionFactory>) -> Self {
        Self {
            factory,
            config: Arc::new(CriteriaConfig::default()),
            restrictions: Arc::new(RestrictionRegistry::new()),
        }
    }

    /// Create a manager with an explicit configuration
    pub fn with_config(factory: Arc<dyn SessionFactory>, config: CriteriaConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            factory,
            config: Arc::new(config),
            restrictions: Arc::new(RestrictionRegistry::new()),
        })
    }

    pub fn config(&self) -> &CriteriaConfig {
        &self.config
    }

    pub fn restrictions(&self) -> &Arc<RestrictionRegistry> {
        &self.restrictions
    }

    /// Register the query restriction applied to every query for `T` built inside units of
    /// work of this manager
    pub fn register_restriction<T: Entity>(&self, restriction: Arc<dyn QueryRestriction<T>>) {
        self.restrictions.register(restriction);
    }

    /// Run `work` on the default persistence unit
    ///
    /// # Arguments
    ///
    /// * `work` - Closure receiving the open unit of work; call
    ///   [`UnitOfWork::mark_dirty`] to have its changes committed
    ///
    /// # Returns
    ///
    /// The value returned by `work`, or the first error of the work, the session or the
    /// commit
    pub fn with_tx<R, E, F>(&self, work: F) -> std::result::Result<R, E>
    where
        E: From<Error>,
        F: FnOnce(&UnitOfWork) -> std::result::Result<R, E>,
    {
        let options = TxOptions::new(self.config.default_unit.clone())
            .read_only(self.config.default_read_only);
        self.with_tx_options(options, work)
    }

    /// Run `work` on the default persistence unit without a transaction
    pub fn with_read_only_tx<R, E, F>(&self, work: F) -> std::result::Result<R, E>
    where
        E: From<Error>,
        F: FnOnce(&UnitOfWork) -> std::result::Result<R, E>,
    {
        let options = TxOptions::new(self.config.default_unit.clone()).read_only(true);
        self.with_tx_options(options, work)
    }

    /// Run `work` with explicit options
    ///
    /// On success the transaction is committed if the work called `mark_dirty` and the
    /// transaction is not rollback-only, and rolled back otherwise. On failure it is rolled
    /// back; rollback failures are logged and the work's error is returned. The session is
    /// closed on every path, including panics inside `work`.
    pub fn with_tx_options<R, E, F>(
        &self,
        options: TxOptions,
        work: F,
    ) -> std::result::Result<R, E>
    where
        E: From<Error>,
        F: FnOnce(&UnitOfWork) -> std::result::Result<R, E>,
    {
        let session = self.factory.open_session(&options.unit)?;
        let scope = UnitOfWork::begin(
            session,
            options,
            Arc::clone(&self.restrictions),
            self.config.max_in_size,
        )?;

        match work(&scope) {
            Ok(value) => {
                scope.complete()?;
                Ok(value)
            }
            Err(e) => {
                log::debug!("Unit of work {} failed, rolling back", scope.id());
                scope.abort();
                Err(e)
            }
        }
    }

    /// Open a session for callers that manage transactions themselves
    pub fn open_session(&self, unit: &str) -> Result<Arc<dyn PersistenceSession>> {
        self.factory.open_session(unit)
    }

    /// Begin a transaction on `session`
    pub fn begin(session: &dyn PersistenceSession) -> Result<()> {
        session.transaction().begin()?;
        log::debug!("Transaction begun on session {}", session.id());
        Ok(())
    }

    /// Commit the active transaction of `session`
    pub fn commit(session: &dyn PersistenceSession) -> Result<()> {
        let tx = session.transaction();
        if !tx.is_active() {
            return Err(Error::Transaction(format!(
                "Session {} has no active transaction to commit",
                session.id()
            )));
        }
        tx.commit()?;
        log::info!("Transaction on session {} committed", session.id());
        Ok(())
    }

    /// Roll back the active transaction of `session`; no-op without one
    pub fn rollback(session: &dyn PersistenceSession) -> Result<()> {
        let tx = session.transaction();
        if !tx.is_active() {
            return Ok(());
        }
        tx.rollback()?;
        log::info!("Transaction on session {} rolled back", session.id());
        Ok(())
    }
}
