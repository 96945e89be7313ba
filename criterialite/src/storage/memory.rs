// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! In-memory relational store
//!
//! [`MemoryStore`] keeps committed tables and hands out [`MemorySession`]s. A session's
//! transaction works on a private copy of the tables and records every write in a log;
//! commit replays the log onto the committed tables under the store's write lock, so a
//! unit of work becomes visible to other sessions all at once or not at all.

use super::eval::{self, Output, Tables};
use crate::config::DEFAULT_UNIT;
use crate::error::{Error, Result};
use crate::query::CriteriaPlan;
use crate::schema::{Entity, EntitySchema, FieldType, IdGeneration, SchemaRegistry};
use crate::session::{PersistenceSession, SessionFactory, SessionTransaction};
use crate::types::{Record, Value};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// A single buffered write
#[derive(Debug, Clone)]
enum WriteOp {
    Insert { entity: String, record: Record },
    Update { entity: String, record: Record },
    Delete { entity: String, id: Value },
}

impl WriteOp {
    fn apply(&self, schema: &SchemaRegistry, tables: &mut Tables) -> Result<()> {
        match self {
            WriteOp::Insert { entity, record } => {
                let id_field = &schema.get(entity)?.id_field;
                let rows = tables.entry(entity.clone()).or_default();
                let id = record.get(id_field);
                if rows.iter().any(|row| row.get(id_field) == id) {
                    return Err(Error::Session(format!(
                        "Duplicate id {} for {}",
                        id, entity
                    )));
                }
                rows.push(record.clone());
            }
            WriteOp::Update { entity, record } => {
                let id_field = &schema.get(entity)?.id_field;
                let id = record.get(id_field);
                let row = tables
                    .get_mut(entity)
                    .and_then(|rows| rows.iter_mut().find(|row| row.get(id_field) == id))
                    .ok_or_else(|| Error::Session(format!("No {} with id {}", entity, id)))?;
                *row = record.clone();
            }
            WriteOp::Delete { entity, id } => {
                let id_field = &schema.get(entity)?.id_field;
                let rows = tables
                    .get_mut(entity)
                    .ok_or_else(|| Error::Session(format!("No {} with id {}", entity, id)))?;
                let position = rows
                    .iter()
                    .position(|row| row.get(id_field) == id)
                    .ok_or_else(|| Error::Session(format!("No {} with id {}", entity, id)))?;
                rows.remove(position);
            }
        }
        Ok(())
    }
}

/// Check a record against its schema: no unknown fields, declared types, nullability.
/// Absent nullable fields are filled with null.
fn conform(schema: &EntitySchema, mut record: Record) -> Result<Record> {
    if let Some((name, _)) = record.fields().find(|(name, _)| schema.field(name).is_none()) {
        return Err(Error::Session(format!(
            "Unknown property {} of {}",
            name, schema.name
        )));
    }
    for field in &schema.fields {
        let value = record.get(&field.name);
        if value.is_null() {
            if !field.nullable {
                return Err(Error::Session(format!(
                    "Property {}.{} must not be null",
                    schema.name, field.name
                )));
            }
            if !record.contains_field(&field.name) {
                record.set(field.name.clone(), Value::Null);
            }
        } else if !field.field_type.accepts(value) {
            return Err(Error::Session(format!(
                "Property {}.{} expects {:?}, got {}",
                schema.name,
                field.name,
                field.field_type,
                value.type_name()
            )));
        } else if let (FieldType::Float, Value::Integer(n)) = (field.field_type, value) {
            // Float columns store Float values only
            let widened = Value::Float(*n as f64);
            record.set(field.name.clone(), widened);
        }
    }
    Ok(record)
}

struct StoreState {
    schema: Arc<SchemaRegistry>,
    tables: RwLock<Tables>,
    sequences: Mutex<HashMap<String, i64>>,
    units: RwLock<HashSet<String>>,
}

impl StoreState {
    /// Assign the next sequence value to `record` when its id is null
    fn assign_id(&self, schema: &EntitySchema, record: &mut Record) -> Result<()> {
        if !record.get(&schema.id_field).is_null() {
            if let (IdGeneration::Sequence, Some(id)) =
                (schema.id_generation, record.get(&schema.id_field).as_integer())
            {
                let mut sequences = self.sequences.lock();
                let current = sequences.entry(schema.name.clone()).or_insert(0);
                *current = (*current).max(id);
            }
            return Ok(());
        }
        match schema.id_generation {
            IdGeneration::Sequence => {
                let mut sequences = self.sequences.lock();
                let current = sequences.entry(schema.name.clone()).or_insert(0);
                *current += 1;
                record.set(schema.id_field.clone(), *current);
                Ok(())
            }
            IdGeneration::Assigned => Err(Error::Session(format!(
                "{} ids are assigned by the application, {} is null",
                schema.name, schema.id_field
            ))),
        }
    }
}

/// In-process store implementing [`SessionFactory`]
///
/// Cloning yields another handle to the same tables.
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<StoreState>,
}

impl MemoryStore {
    /// Create an empty store serving the `default` persistence unit
    pub fn new(schema: Arc<SchemaRegistry>) -> Self {
        let mut units = HashSet::new();
        units.insert(DEFAULT_UNIT.to_string());
        Self {
            state: Arc::new(StoreState {
                schema,
                tables: RwLock::new(Tables::new()),
                sequences: Mutex::new(HashMap::new()),
                units: RwLock::new(units),
            }),
        }
    }

    /// Also serve persistence unit `unit`
    pub fn with_unit(self, unit: &str) -> Self {
        self.state.units.write().insert(unit.to_string());
        self
    }

    pub fn schema(&self) -> &Arc<SchemaRegistry> {
        &self.state.schema
    }

    /// Insert a committed row directly, bypassing sessions; returns the stored row
    pub fn seed_record(&self, entity: &str, record: Record) -> Result<Record> {
        let schema = self.state.schema.get(entity)?;
        let mut record = record;
        self.state.assign_id(schema, &mut record)?;
        let record = conform(schema, record)?;
        let op = WriteOp::Insert {
            entity: entity.to_string(),
            record: record.clone(),
        };
        op.apply(&self.state.schema, &mut self.state.tables.write())?;
        Ok(record)
    }

    /// Insert a committed entity directly and write a generated id back into it
    pub fn seed<T: Entity>(&self, entity: &mut T) -> Result<()> {
        let stored = self.seed_record(&T::schema().name, entity.to_record()?)?;
        *entity = T::from_record(&stored)?;
        Ok(())
    }

    /// Number of committed rows of `entity`
    pub fn count_rows(&self, entity: &str) -> usize {
        self.state.tables.read().get(entity).map_or(0, Vec::len)
    }

    /// Snapshot of the committed rows of `entity`
    pub fn rows(&self, entity: &str) -> Vec<Record> {
        self.state
            .tables
            .read()
            .get(entity)
            .cloned()
            .unwrap_or_default()
    }
}

impl SessionFactory for MemoryStore {
    fn open_session(&self, unit: &str) -> Result<Arc<dyn PersistenceSession>> {
        if !self.state.units.read().contains(unit) {
            return Err(Error::Session(format!("Unknown persistence unit {}", unit)));
        }
        let session = MemorySession::new(Arc::clone(&self.state), unit);
        log::debug!("Opened session {} on unit {}", session.id, unit);
        Ok(Arc::new(session))
    }
}

/// Private working copy of an active transaction
struct TxBuffer {
    working: Tables,
    log: Vec<WriteOp>,
}

pub struct MemoryTransaction {
    store: Arc<StoreState>,
    buffer: Mutex<Option<TxBuffer>>,
    rollback_only: AtomicBool,
}

impl SessionTransaction for MemoryTransaction {
    fn begin(&self) -> Result<()> {
        let mut buffer = self.buffer.lock();
        if buffer.is_some() {
            return Err(Error::Transaction(
                "Transaction already active".to_string(),
            ));
        }
        *buffer = Some(TxBuffer {
            working: self.store.tables.read().clone(),
            log: Vec::new(),
        });
        self.rollback_only.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let buffer = self
            .buffer
            .lock()
            .take()
            .ok_or_else(|| Error::Transaction("No active transaction to commit".to_string()))?;
        if self.rollback_only.swap(false, Ordering::SeqCst) {
            return Err(Error::Transaction(
                "Transaction is marked rollback-only and was rolled back".to_string(),
            ));
        }

        let mut tables = self.store.tables.write();
        let mut next = tables.clone();
        for op in &buffer.log {
            op.apply(&self.store.schema, &mut next)
                .map_err(|e| Error::Transaction(format!("Commit failed: {}", e)))?;
        }
        *tables = next;
        log::debug!("Committed {} writes", buffer.log.len());
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let buffer = self
            .buffer
            .lock()
            .take()
            .ok_or_else(|| Error::Transaction("No active transaction to roll back".to_string()))?;
        self.rollback_only.store(false, Ordering::SeqCst);
        log::debug!("Rolled back {} writes", buffer.log.len());
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.buffer.lock().is_some()
    }

    fn is_rollback_only(&self) -> bool {
        self.rollback_only.load(Ordering::SeqCst)
    }

    fn set_rollback_only(&self) {
        if self.is_active() {
            self.rollback_only.store(true, Ordering::SeqCst);
        }
    }
}

/// Session over a [`MemoryStore`]
///
/// Reads see the transaction's working copy while a transaction is active and the
/// committed tables otherwise. Writes require an active transaction.
pub struct MemorySession {
    id: String,
    unit: String,
    store: Arc<StoreState>,
    tx: MemoryTransaction,
    managed: Mutex<HashSet<(String, Value)>>,
    open: AtomicBool,
}

impl MemorySession {
    fn new(store: Arc<StoreState>, unit: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            unit: unit.to_string(),
            tx: MemoryTransaction {
                store: Arc::clone(&store),
                buffer: Mutex::new(None),
                rollback_only: AtomicBool::new(false),
            },
            store,
            managed: Mutex::new(HashSet::new()),
            open: AtomicBool::new(true),
        }
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(Error::Session(format!("Session {} is closed", self.id)))
        }
    }

    fn read<R>(&self, f: impl FnOnce(&Tables) -> Result<R>) -> Result<R> {
        self.ensure_open()?;
        let buffer = self.tx.buffer.lock();
        match buffer.as_ref() {
            Some(buffer) => f(&buffer.working),
            None => f(&self.store.tables.read()),
        }
    }

    /// Apply a write to the working copy; a failed write dooms the transaction
    fn write(&self, op: WriteOp) -> Result<()> {
        self.ensure_open()?;
        let mut guard = self.tx.buffer.lock();
        let buffer = guard.as_mut().ok_or_else(|| {
            Error::Transaction(format!("Session {} has no active transaction", self.id))
        })?;
        match op.apply(&self.store.schema, &mut buffer.working) {
            Ok(()) => {
                buffer.log.push(op);
                Ok(())
            }
            Err(e) => {
                self.tx.rollback_only.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    fn manage(&self, entity: &str, id: Value) {
        self.managed.lock().insert((entity.to_string(), id));
    }

    fn rows(&self, plan: &CriteriaPlan) -> Result<Vec<Record>> {
        let output = self.read(|tables| eval::execute(&self.store.schema, tables, plan))?;
        let rows = match output {
            Output::Rows(rows) => rows,
            _ => {
                return Err(Error::Session(format!(
                    "Plan with a projection cannot return entities: {}",
                    plan
                )))
            }
        };
        let id_field = &self.store.schema.get(&plan.entity)?.id_field;
        let mut managed = self.managed.lock();
        for row in &rows {
            managed.insert((plan.entity.clone(), row.get(id_field).clone()));
        }
        Ok(rows)
    }
}

impl PersistenceSession for MemorySession {
    fn id(&self) -> &str {
        &self.id
    }

    fn list(&self, plan: &CriteriaPlan) -> Result<Vec<Record>> {
        self.rows(plan)
    }

    fn unique(&self, plan: &CriteriaPlan) -> Result<Option<Record>> {
        let mut rows = self.rows(plan)?;
        match rows.len() {
            0 | 1 => Ok(rows.pop()),
            count => Err(Error::NonUniqueResult { count }),
        }
    }

    fn scalar(&self, plan: &CriteriaPlan) -> Result<Value> {
        match self.read(|tables| eval::execute(&self.store.schema, tables, plan))? {
            Output::Scalar(value) => Ok(value),
            _ => Err(Error::Session(format!(
                "Plan does not compute a scalar: {}",
                plan
            ))),
        }
    }

    fn transaction(&self) -> &dyn SessionTransaction {
        &self.tx
    }

    fn contains(&self, entity: &str, id: &Value) -> bool {
        self.managed.lock().contains(&(entity.to_string(), id.clone()))
    }

    fn persist(&self, entity: &str, record: Record) -> Result<Record> {
        self.ensure_open()?;
        let schema = self.store.schema.get(entity)?;
        if !self.tx.is_active() {
            return Err(Error::Transaction(format!(
                "Session {} has no active transaction",
                self.id
            )));
        }
        let mut record = record;
        self.store.assign_id(schema, &mut record)?;
        let record = conform(schema, record)?;
        let id = record.get(&schema.id_field).clone();
        self.write(WriteOp::Insert {
            entity: entity.to_string(),
            record: record.clone(),
        })?;
        self.manage(entity, id);
        Ok(record)
    }

    fn merge(&self, entity: &str, record: Record) -> Result<Record> {
        let schema = self.store.schema.get(entity)?;
        let record = conform(schema, record)?;
        let id = record.get(&schema.id_field).clone();
        self.write(WriteOp::Update {
            entity: entity.to_string(),
            record: record.clone(),
        })?;
        self.manage(entity, id);
        Ok(record)
    }

    fn remove(&self, entity: &str, id: &Value) -> Result<()> {
        self.store.schema.get(entity)?;
        self.write(WriteOp::Delete {
            entity: entity.to_string(),
            id: id.clone(),
        })?;
        self.managed.lock().remove(&(entity.to_string(), id.clone()));
        Ok(())
    }

    fn refresh(&self, entity: &str, id: &Value) -> Result<Record> {
        let id_field = &self.store.schema.get(entity)?.id_field;
        let record = self.read(|tables| {
            tables
                .get(entity)
                .and_then(|rows| rows.iter().find(|row| row.get(id_field) == id))
                .cloned()
                .ok_or_else(|| Error::Session(format!("No {} with id {}", entity, id)))
        })?;
        self.manage(entity, id.clone());
        Ok(record)
    }

    fn close(&self) -> Result<()> {
        if !self.open.swap(false, Ordering::SeqCst) {
            return Ok(());
        }
        if self.tx.is_active() {
            log::warn!("Closing session {} with an active transaction", self.id);
            self.tx.rollback()?;
        }
        self.managed.lock().clear();
        log::debug!("Closed session {}", self.id);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }
}
