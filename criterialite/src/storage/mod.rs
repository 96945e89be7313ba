// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Bundled storage backend
//!
//! An in-memory store that evaluates [`crate::query::CriteriaPlan`]s directly. It backs
//! the test suite and small embedded uses; other backends implement the traits in
//! [`crate::session`].

mod eval;
pub mod memory;

pub use memory::{MemorySession, MemoryStore, MemoryTransaction};
