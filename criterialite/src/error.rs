// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Error types

use thiserror::Error;

/// Errors raised while building criteria, executing them or managing units of work
///
/// `InvalidArgument`, `InvalidState` and `NonUniqueResult` signal programming errors in query
/// construction and are raised at the offending call. They are never retried.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Non-unique result: expected at most one row, found {count}")]
    NonUniqueResult { count: usize },

    #[error("Session error: {0}")]
    Session(String),

    #[error("Transaction error: {0}")]
    Transaction(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Mapping error: {0}")]
    Mapping(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Mapping(error.to_string())
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;
