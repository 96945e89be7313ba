// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
// Entity schema descriptors: fields, identity and associations

use crate::error::{Error, Result};
use crate::types::Value;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Column type of a mapped field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldType {
    Boolean,
    Integer,
    Float,
    String,
}

impl FieldType {
    /// Check whether a non-null value can be stored in a column of this type
    pub fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (FieldType::Boolean, Value::Boolean(_))
                | (FieldType::Integer, Value::Integer(_))
                | (FieldType::Float, Value::Float(_) | Value::Integer(_))
                | (FieldType::String, Value::String(_))
        )
    }
}

/// A mapped scalar field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub nullable: bool,
}

/// How an association is stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssociationKind {
    /// The source row holds the target id in `foreign_key`
    ManyToOne { foreign_key: String },
    /// Target rows hold the source id in `mapped_by`
    OneToMany { mapped_by: String },
}

/// A named association to another entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssociationDef {
    pub name: String,
    pub target: String,
    pub kind: AssociationKind,
}

/// Identity generation strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdGeneration {
    /// The application assigns the id before saving
    Assigned,
    /// The store assigns the next integer of a per-entity sequence when the id is null
    Sequence,
}

/// Complete mapping of one entity type
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySchema {
    pub name: String,
    pub id_field: String,
    pub id_generation: IdGeneration,
    pub natural_id: Vec<String>,
    pub fields: Vec<FieldDef>,
    pub associations: Vec<AssociationDef>,
}

impl EntitySchema {
    pub fn builder(name: impl Into<String>) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            name: name.into(),
            id: None,
            natural_id: Vec::new(),
            fields: Vec::new(),
            associations: Vec::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn association(&self, name: &str) -> Option<&AssociationDef> {
        self.associations.iter().find(|a| a.name == name)
    }

    pub fn is_natural_id(&self, field: &str) -> bool {
        self.natural_id.iter().any(|f| f == field)
    }
}

/// Fluent builder for [`EntitySchema`]
#[derive(Debug, Clone)]
pub struct EntitySchemaBuilder {
    name: String,
    id: Option<(String, IdGeneration)>,
    natural_id: Vec<String>,
    fields: Vec<FieldDef>,
    associations: Vec<AssociationDef>,
}

impl EntitySchemaBuilder {
    /// Declare the identity field (never nullable)
    pub fn id(mut self, name: &str, field_type: FieldType, generation: IdGeneration) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            field_type,
            nullable: false,
        });
        self.id = Some((name.to_string(), generation));
        self
    }

    pub fn field(mut self, name: &str, field_type: FieldType) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            field_type,
            nullable: false,
        });
        self
    }

    pub fn nullable_field(mut self, name: &str, field_type: FieldType) -> Self {
        self.fields.push(FieldDef {
            name: name.to_string(),
            field_type,
            nullable: true,
        });
        self
    }

    /// Declare a many-to-one association whose foreign key is a field of this entity
    pub fn many_to_one(mut self, name: &str, target: &str, foreign_key: &str) -> Self {
        self.associations.push(AssociationDef {
            name: name.to_string(),
            target: target.to_string(),
            kind: AssociationKind::ManyToOne {
                foreign_key: foreign_key.to_string(),
            },
        });
        self
    }

    /// Declare a one-to-many association backed by a foreign key on the target
    pub fn one_to_many(mut self, name: &str, target: &str, mapped_by: &str) -> Self {
        self.associations.push(AssociationDef {
            name: name.to_string(),
            target: target.to_string(),
            kind: AssociationKind::OneToMany {
                mapped_by: mapped_by.to_string(),
            },
        });
        self
    }

    pub fn natural_id(mut self, field: &str) -> Self {
        self.natural_id.push(field.to_string());
        self
    }

    /// Validate and produce the schema
    pub fn build(self) -> Result<EntitySchema> {
        if self.name.is_empty() {
            return Err(Error::Schema("Entity name must not be empty".to_string()));
        }
        let (id_field, id_generation) = self
            .id
            .ok_or_else(|| Error::Schema(format!("Entity {} declares no id field", self.name)))?;

        let mut seen = HashSet::new();
        for field in &self.fields {
            if field.name.is_empty() || field.name.contains('.') {
                return Err(Error::Schema(format!(
                    "Invalid field name '{}' on {}",
                    field.name, self.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(Error::Schema(format!(
                    "Duplicate field {} on {}",
                    field.name, self.name
                )));
            }
        }

        if id_generation == IdGeneration::Sequence {
            let id_type = self.fields.iter().find(|f| f.name == id_field);
            if id_type.map(|f| f.field_type) != Some(FieldType::Integer) {
                return Err(Error::Schema(format!(
                    "Sequence ids must be Integer fields ({}.{})",
                    self.name, id_field
                )));
            }
        }

        let mut association_names = HashSet::new();
        for association in &self.associations {
            if association.name.contains('.')
                || !association_names.insert(association.name.as_str())
            {
                return Err(Error::Schema(format!(
                    "Invalid or duplicate association {} on {}",
                    association.name, self.name
                )));
            }
            if let AssociationKind::ManyToOne { foreign_key } = &association.kind {
                if !seen.contains(foreign_key.as_str()) {
                    return Err(Error::Schema(format!(
                        "Foreign key {} of association {}.{} is not a declared field",
                        foreign_key, self.name, association.name
                    )));
                }
            }
        }

        for field in &self.natural_id {
            if !seen.contains(field.as_str()) {
                return Err(Error::Schema(format!(
                    "Natural id {} is not a declared field of {}",
                    field, self.name
                )));
            }
        }

        Ok(EntitySchema {
            name: self.name,
            id_field,
            id_generation,
            natural_id: self.natural_id,
            fields: self.fields,
            associations: self.associations,
        })
    }
}
