// shelfbase-core/src/lib.rs
// Validated record collections over pluggable stores

pub mod collection;
pub mod config;
pub mod database;
pub mod error;
pub mod lookup;
pub mod merge;
pub mod models;
pub mod record;
pub mod schema;
pub mod seed;
pub mod storage;

// Public exports
pub use collection::{Collection, Key};
pub use config::{BackendKind, ShelfConfig};
pub use database::Database;
pub use error::{Result, ShelfError};
pub use lookup::Filter;
pub use merge::merge;
pub use models::{Book, Todo};
pub use record::{FieldMap, IdStrategy, Payload, Record, RecordId};
pub use schema::{FieldKind, FieldViolation, Patch, Rule, Schema, ValidationErrors};
pub use storage::{Backend, MemoryStore, RecordStore, TableStore};
