// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Runtime configuration

use crate::error::{Error, Result};
use crate::query::MAX_IN_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persistence unit used when none is named
pub const DEFAULT_UNIT: &str = "default";

/// Configuration of the query and unit-of-work layers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriteriaConfig {
    /// Maximum number of values in one membership clause
    pub max_in_size: usize,

    /// Persistence unit opened by `with_tx`
    pub default_unit: String,

    /// Whether `with_tx` runs without a transaction
    pub default_read_only: bool,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            max_in_size: MAX_IN_SIZE,
            default_unit: DEFAULT_UNIT.to_string(),
            default_read_only: false,
        }
    }
}

impl CriteriaConfig {
    /// Parse a JSON document; missing keys keep their defaults
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read {}: {}", path.display(), e))
        })?;
        log::debug!("Loading configuration from {}", path.display());
        Self::from_json_str(&json)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_in_size == 0 {
            return Err(Error::Config(
                "max_in_size must be at least 1".to_string(),
            ));
        }
        if self.default_unit.trim().is_empty() {
            return Err(Error::Config(
                "default_unit must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
