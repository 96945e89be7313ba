// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Units of work with an explicit commit decision
//!
//! Work runs through [`TransactionManager::with_tx`] and receives a [`UnitOfWork`]. Nothing
//! is committed unless the work calls [`UnitOfWork::mark_dirty`]; reading, or failing,
//! leaves the store unchanged.

pub mod manager;
pub mod scope;
pub mod state;

pub use manager::TransactionManager;
pub use scope::UnitOfWork;
pub use state::{TxOptions, TxState};
