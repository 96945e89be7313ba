// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Startup-time registry of entity schemas

use super::types::{AssociationKind, EntitySchema};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// All entity schemas known to a store, validated as a whole
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    entities: HashMap<String, EntitySchema>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    /// Look up the schema of an entity by name
    pub fn get(&self, entity: &str) -> Result<&EntitySchema> {
        self.entities
            .get(entity)
            .ok_or_else(|| Error::Schema(format!("Unknown entity {}", entity)))
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entities.contains_key(entity)
    }

    pub fn entity_names(&self) -> impl Iterator<Item = &str> {
        self.entities.keys().map(String::as_str)
    }
}

#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    entities: Vec<EntitySchema>,
}

impl SchemaRegistryBuilder {
    pub fn entity(mut self, schema: &EntitySchema) -> Self {
        self.entities.push(schema.clone());
        self
    }

    /// Validate cross-entity references and build the registry
    pub fn build(self) -> Result<SchemaRegistry> {
        let mut entities = HashMap::with_capacity(self.entities.len());
        for schema in self.entities {
            if entities.contains_key(&schema.name) {
                return Err(Error::Schema(format!(
                    "Entity {} registered twice",
                    schema.name
                )));
            }
            entities.insert(schema.name.clone(), schema);
        }

        for schema in entities.values() {
            for association in &schema.associations {
                let target = entities.get(&association.target).ok_or_else(|| {
                    Error::Schema(format!(
                        "Association {}.{} targets unknown entity {}",
                        schema.name, association.name, association.target
                    ))
                })?;
                if let AssociationKind::OneToMany { mapped_by } = &association.kind {
                    if target.field(mapped_by).is_none() {
                        return Err(Error::Schema(format!(
                            "Association {}.{} is mapped by {}.{}, which is not a declared field",
                            schema.name, association.name, target.name, mapped_by
                        )));
                    }
                }
            }
        }

        log::debug!("Schema registry built with {} entities", entities.len());
        Ok(SchemaRegistry { entities })
    }
}
