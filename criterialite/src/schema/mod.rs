// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Explicit entity mapping
//!
//! Entities describe their table layout with an [`EntitySchema`] resolved once at
//! startup. The [`Entity`] trait is the "identified entity" capability: a serde-mappable
//! type that knows its schema and can expose its id.

pub mod registry;
pub mod types;

pub use registry::{SchemaRegistry, SchemaRegistryBuilder};
pub use types::{
    AssociationDef, AssociationKind, EntitySchema, EntitySchemaBuilder, FieldDef, FieldType,
    IdGeneration,
};

use crate::error::Result;
use crate::types::{Record, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A persistent type with an explicit schema
///
/// ```ignore
/// static TASK: Lazy<EntitySchema> = Lazy::new(|| {
///     EntitySchema::builder("task")
///         .id("id", FieldType::Integer, IdGeneration::Sequence)
///         .field("name", FieldType::String)
///         .build()
///         .expect("valid task schema")
/// });
///
/// impl Entity for Task {
///     fn schema() -> &'static EntitySchema {
///         &TASK
///     }
/// }
/// ```
pub trait Entity: Serialize + DeserializeOwned + Send + 'static {
    fn schema() -> &'static EntitySchema;

    fn to_record(&self) -> Result<Record> {
        Record::from_entity(self)
    }

    fn from_record(record: &Record) -> Result<Self> {
        record.into_entity()
    }

    /// Current value of the id field (null before a generated id is assigned)
    fn id(&self) -> Result<Value> {
        Ok(self.to_record()?.get(&Self::schema().id_field).clone())
    }
}
