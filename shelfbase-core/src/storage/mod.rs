// src/storage/mod.rs
//! Record store abstraction
//!
//! ```text
//! RecordStore trait
//!   ├── MemoryStore (arena keyed by insertion slot)
//!   └── TableStore  (single persisted table, MemoryStore mirror)
//! ```
//!
//! A store owns its records exclusively and mints identities. It does no
//! validation; `Collection` is its only caller.

mod memory_store;
mod table_store;

use std::path::Path;

use crate::config::{BackendKind, StorageConfig};
use crate::error::Result;
use crate::record::{FieldMap, Record, RecordId};
use crate::schema::Schema;

pub use self::memory_store::MemoryStore;
pub use self::table_store::{Column, TableStore};

/// Raw insert/replace/remove/scan over one record type
pub trait RecordStore: Send + Sync {
    /// Store a new record and return the identity assigned to it
    fn insert(&mut self, fields: FieldMap) -> Result<RecordId>;

    /// Fetch one record; `NotFound` when the id is not live
    fn get(&self, id: &RecordId) -> Result<Record>;

    /// Overwrite a live record in place, keeping its position
    fn replace(&mut self, record: Record) -> Result<()>;

    /// Delete a record and hand it back; `NotFound` when the id is not live
    fn remove(&mut self, id: &RecordId) -> Result<Record>;

    /// Snapshot of every live record in insertion order
    fn scan(&self) -> Result<Vec<Record>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Push pending state to durable storage (no-op in memory)
    fn flush(&mut self) -> Result<()>;
}

/// Store chosen at runtime from configuration
pub enum Backend {
    Memory(MemoryStore),
    Table(TableStore),
}

impl Backend {
    pub fn open(config: &StorageConfig, schema: &Schema) -> Result<Self> {
        match config.backend {
            BackendKind::Memory => Ok(Backend::Memory(MemoryStore::new(schema.identity))),
            BackendKind::Table => Ok(Backend::Table(TableStore::open(&config.data_dir, schema)?)),
        }
    }

    /// Backing file, if any
    pub fn path(&self) -> Option<&Path> {
        match self {
            Backend::Memory(_) => None,
            Backend::Table(table) => Some(table.path()),
        }
    }
}

impl RecordStore for Backend {
    fn insert(&mut self, fields: FieldMap) -> Result<RecordId> {
        match self {
            Backend::Memory(store) => store.insert(fields),
            Backend::Table(store) => store.insert(fields),
        }
    }

    fn get(&self, id: &RecordId) -> Result<Record> {
        match self {
            Backend::Memory(store) => store.get(id),
            Backend::Table(store) => store.get(id),
        }
    }

    fn replace(&mut self, record: Record) -> Result<()> {
        match self {
            Backend::Memory(store) => store.replace(record),
            Backend::Table(store) => store.replace(record),
        }
    }

    fn remove(&mut self, id: &RecordId) -> Result<Record> {
        match self {
            Backend::Memory(store) => store.remove(id),
            Backend::Table(store) => store.remove(id),
        }
    }

    fn scan(&self) -> Result<Vec<Record>> {
        match self {
            Backend::Memory(store) => store.scan(),
            Backend::Table(store) => store.scan(),
        }
    }

    fn len(&self) -> usize {
        match self {
            Backend::Memory(store) => store.len(),
            Backend::Table(store) => store.len(),
        }
    }

    fn flush(&mut self) -> Result<()> {
        match self {
            Backend::Memory(store) => store.flush(),
            Backend::Table(store) => store.flush(),
        }
    }
}
