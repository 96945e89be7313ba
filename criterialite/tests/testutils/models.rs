//! Task/User test model
//!
//! A task has an optional creator (many-to-one on the user's email); a user sees the tasks
//! it created through the one-to-many `tasks` association.

use criterialite::schema::{EntitySchema, FieldType, IdGeneration};
use criterialite::Entity;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

pub static USER: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::builder("user")
        .id("email", FieldType::String, IdGeneration::Assigned)
        .field("name", FieldType::String)
        .field("default_priority", FieldType::Integer)
        .field("age", FieldType::Integer)
        .one_to_many("tasks", "task", "creator")
        .natural_id("name")
        .build()
        .expect("valid user schema")
});

pub static TASK: Lazy<EntitySchema> = Lazy::new(|| {
    EntitySchema::builder("task")
        .id("id", FieldType::Integer, IdGeneration::Sequence)
        .field("name", FieldType::String)
        .nullable_field("done", FieldType::Boolean)
        .field("priority", FieldType::Integer)
        .nullable_field("creator", FieldType::String)
        .many_to_one("creator", "user", "creator")
        .build()
        .expect("valid task schema")
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    pub name: String,
    pub default_priority: i64,
    pub age: i64,
}

impl User {
    pub fn new(email: &str, name: &str, default_priority: i64, age: i64) -> Self {
        Self {
            email: email.to_string(),
            name: name.to_string(),
            default_priority,
            age,
        }
    }
}

impl Entity for User {
    fn schema() -> &'static EntitySchema {
        &USER
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<i64>,
    pub name: String,
    pub done: Option<bool>,
    pub priority: i64,
    pub creator: Option<String>,
}

impl Task {
    pub fn new(name: &str, done: Option<bool>, priority: i64, creator: Option<&str>) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            done,
            priority,
            creator: creator.map(str::to_string),
        }
    }
}

impl Entity for Task {
    fn schema() -> &'static EntitySchema {
        &TASK
    }
}

/// Sorted task names, for order-independent assertions
pub fn names(tasks: &[Task]) -> Vec<String> {
    let mut names: Vec<String> = tasks.iter().map(|t| t.name.clone()).collect();
    names.sort();
    names
}
