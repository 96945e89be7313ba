//! Test fixture for CriteriaLite integration tests
//!
//! Every fixture owns its own store, so tests are isolated from each other.

use super::models::{Task, User, TASK, USER};
use criterialite::{
    Finder, MemoryStore, PersistenceSession, SchemaRegistry, SessionFactory,
    TransactionManager,
};
use std::sync::Arc;

pub const JENS: &str = "mail@jensjaeger.com";
pub const MAX: &str = "max@example.com";
pub const TOM: &str = "tom@example.com";

/// Isolated store with the Task/User data set
pub struct TestFixture {
    store: MemoryStore,
    manager: TransactionManager,
}

impl TestFixture {
    /// Create an empty fixture
    pub fn empty() -> Self {
        criterialite::logging::try_init_for_tests();
        let schema = SchemaRegistry::builder()
            .entity(&USER)
            .entity(&TASK)
            .build()
            .expect("valid schema registry");
        let store = MemoryStore::new(Arc::new(schema));
        let manager = TransactionManager::new(Arc::new(store.clone()));
        Self { store, manager }
    }

    /// Create a fixture with three users and five tasks
    ///
    /// | task   | done  | priority | creator |
    /// |--------|-------|----------|---------|
    /// | Task 1 | false | 1        | jens    |
    /// | Task 2 | null  | 3        | max     |
    /// | Task 3 | false | 5        | tom     |
    /// | Task 4 | true  | 3        | -       |
    /// | jens   | false | 2        | jens    |
    pub fn new() -> Self {
        let fixture = Self::empty();
        fixture.insert_sample_data();
        fixture
    }

    pub fn insert_sample_data(&self) {
        let users = [
            User::new(JENS, "jens", 3, 30),
            User::new(MAX, "max", 1, 25),
            User::new(TOM, "tom", 4, 20),
        ];
        for mut user in users {
            self.store.seed(&mut user).expect("seed user");
        }

        let tasks = [
            Task::new("Task 1", Some(false), 1, Some(JENS)),
            Task::new("Task 2", None, 3, Some(MAX)),
            Task::new("Task 3", Some(false), 5, Some(TOM)),
            Task::new("Task 4", Some(true), 3, None),
            Task::new("jens", Some(false), 2, Some(JENS)),
        ];
        for mut task in tasks {
            self.store.seed(&mut task).expect("seed task");
        }
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn manager(&self) -> &TransactionManager {
        &self.manager
    }

    /// A fresh session on the default unit, outside any unit of work
    pub fn session(&self) -> Arc<dyn PersistenceSession> {
        self.store
            .open_session("default")
            .expect("open default session")
    }

    pub fn tasks(&self) -> Finder<Task> {
        Finder::new(self.session())
    }

    pub fn users(&self) -> Finder<User> {
        Finder::new(self.session())
    }

    pub fn task_count(&self) -> usize {
        self.store.count_rows("task")
    }
}
