// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Alias namespace of a single query
//!
//! Every builder draws one index from a process-wide wrapping sequence when it is
//! created. Alias names combine the association path with that index, so aliases of
//! builders alive at the same time never collide. Inside one builder each path is
//! registered once, and a path whose name clashes with an earlier one gets a suffix.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicU32, Ordering};

/// Largest alias index before the sequence wraps back to 1
pub const MAX_ALIAS_INDEX: u32 = 9999;

/// Separator of association paths and field names
pub const PATH_SEPARATOR: char = '.';

static ALIAS_SEQUENCE: AtomicU32 = AtomicU32::new(0);

fn advance(current: u32) -> u32 {
    if current >= MAX_ALIAS_INDEX {
        1
    } else {
        current + 1
    }
}

/// Take the next alias index from the process-wide sequence
pub(crate) fn next_alias_index() -> u32 {
    let previous = ALIAS_SEQUENCE
        .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
            Some(advance(current))
        })
        .unwrap_or_default();
    advance(previous)
}

/// Association path to alias table of one query, in join order
#[derive(Debug, Clone)]
pub struct AliasAllocator {
    index: u32,
    aliases: Vec<(String, String)>,
}

impl AliasAllocator {
    pub fn new() -> Self {
        Self::with_index(next_alias_index())
    }

    pub fn with_index(index: u32) -> Self {
        Self {
            index,
            aliases: Vec::new(),
        }
    }

    pub fn index(&self) -> u32 {
        self.index
    }

    pub fn alias_for(&self, path: &str) -> Option<&str> {
        self.aliases
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, alias)| alias.as_str())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.alias_for(path).is_some()
    }

    fn is_taken(&self, alias: &str) -> bool {
        self.aliases.iter().any(|(_, a)| a == alias)
    }

    /// Registered (path, alias) pairs in registration order
    pub fn aliases(&self) -> impl Iterator<Item = (&str, &str)> {
        self.aliases.iter().map(|(p, a)| (p.as_str(), a.as_str()))
    }

    /// Register a new alias for `path`, e.g. `creator.company` becomes `creator_company_12`.
    /// A name already held by another path gets a `_2`, `_3`, ... suffix.
    pub fn create_alias(&mut self, path: &str) -> Result<String> {
        if path.is_empty() {
            return Err(Error::InvalidArgument(
                "association path must not be empty".to_string(),
            ));
        }
        if self.contains(path) {
            return Err(Error::InvalidState(format!(
                "There is already an alias for {}",
                path
            )));
        }

        let base = format!("{}_{}", path.replace(PATH_SEPARATOR, "_"), self.index);
        let mut alias = base.clone();
        let mut suffix = 1;
        while self.is_taken(&alias) {
            suffix += 1;
            alias = format!("{}_{}", base, suffix);
        }
        self.aliases.push((path.to_string(), alias.clone()));
        Ok(alias)
    }

    /// Rewrite a field path so that its association part refers to a registered alias.
    ///
    /// `name` stays `name`, a joined path resolves to its alias, and `a.b.c` becomes
    /// `<alias of a.b>.c`. Unjoined association paths are rejected.
    pub fn alialize(&self, field: &str) -> Result<String> {
        if field.is_empty() {
            return Err(Error::InvalidArgument(
                "field must not be empty".to_string(),
            ));
        }
        if !field.contains(PATH_SEPARATOR) {
            return Ok(field.to_string());
        }
        if let Some(alias) = self.alias_for(field) {
            return Ok(alias.to_string());
        }

        let (path, name) = field
            .rsplit_once(PATH_SEPARATOR)
            .ok_or_else(|| Error::InvalidArgument(format!("Malformed field path {}", field)))?;
        match self.alias_for(path) {
            Some(alias) => Ok(format!("{}{}{}", alias, PATH_SEPARATOR, name)),
            None => Err(Error::InvalidState(format!(
                "Cannot alialize {}, first join on {}",
                field, path
            ))),
        }
    }
}

impl Default for AliasAllocator {
    fn default() -> Self {
        Self::new()
    }
}
