// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Persistence session interface
//!
//! - [`SessionFactory`] opens sessions for named persistence units
//! - [`PersistenceSession`] executes criteria plans and manages entity rows
//! - [`SessionTransaction`] is the begin/commit/rollback handle of a session

pub mod provider;

pub use provider::{PersistenceSession, SessionFactory, SessionTransaction};
