//! Test utilities for CriteriaLite integration tests
//!
//! - models: the Task/User entity pair used throughout the suite
//! - test_fixture: an in-memory store seeded with the Task/User data set

#![allow(dead_code)]

pub mod models;
pub mod test_fixture;
