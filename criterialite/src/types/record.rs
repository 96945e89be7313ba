// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row representation exchanged with the persistence session

use super::value::Value;
use crate::error::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

static NULL: Value = Value::Null;

/// A single row of one entity: field name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field value; absent fields read as null
    pub fn get(&self, field: &str) -> &Value {
        self.fields.get(field).unwrap_or(&NULL)
    }

    pub fn contains_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    /// Builder-style variant of [`Record::set`]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Serialize an entity into a record through its serde representation.
    ///
    /// The entity must serialize as a flat struct of scalar fields.
    pub fn from_entity<T: Serialize>(entity: &T) -> Result<Self> {
        match serde_json::to_value(entity)? {
            serde_json::Value::Object(map) => {
                let mut record = Record::new();
                for (name, json) in &map {
                    record.set(name.clone(), Value::from_json(json)?);
                }
                Ok(record)
            }
            other => Err(Error::Mapping(format!(
                "Entity must serialize to an object, got {}",
                other
            ))),
        }
    }

    /// Deserialize this record into an entity
    pub fn into_entity<T: DeserializeOwned>(&self) -> Result<T> {
        let mut map = serde_json::Map::with_capacity(self.fields.len());
        for (name, value) in &self.fields {
            map.insert(name.clone(), value.to_json()?);
        }
        Ok(serde_json::from_value(serde_json::Value::Object(map))?)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (field, value) in iter {
            record.set(field, value);
        }
        record
    }
}
