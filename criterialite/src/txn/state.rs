// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Unit-of-work state and options

use crate::config::DEFAULT_UNIT;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a unit of work
///
/// `Idle → SessionOpen → (Committed | RolledBack) → Closed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxState {
    /// No session acquired yet
    Idle,
    /// Session open, work running
    SessionOpen,
    /// The transaction was committed
    Committed,
    /// The transaction was rolled back, or a read-only unit finished
    RolledBack,
    /// Session released
    Closed,
}

impl TxState {
    /// Whether the unit has finished its transaction (committed, rolled back or closed)
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            TxState::Committed | TxState::RolledBack | TxState::Closed
        )
    }
}

impl fmt::Display for TxState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TxState::Idle => "idle",
            TxState::SessionOpen => "session-open",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled-back",
            TxState::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Options of a single unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOptions {
    /// Persistence unit to open the session on
    pub unit: String,
    /// Run without beginning a transaction
    pub read_only: bool,
}

impl TxOptions {
    pub fn new(unit: impl Into<String>) -> Self {
        Self {
            unit: unit.into(),
            read_only: false,
        }
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }
}

impl Default for TxOptions {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT)
    }
}
