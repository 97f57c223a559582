// shelfbase-core/src/collection.rs
// Collection manager: the only component that touches a record store
//
// FILE STRUCTURE:
// ├── Key (identity, alternate point key, composite key)
// ├── Constructor
// ├── CRUD Operations: create, list, get, update, delete
// └── Private Helpers: resolve, resolve_composite, single_match

use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::{Result, ShelfError};
use crate::lookup::{self, Filter};
use crate::merge::merge;
use crate::record::{Payload, Record, RecordId};
use crate::schema::{Rule, Schema, ValidationErrors};
use crate::storage::RecordStore;

/// Address of a single record
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    /// Primary identity
    Id(RecordId),
    /// A field declared as an alternate point key
    Alternate { field: String, value: Value },
    /// Values for the schema's composite-key fields, in declaration order
    Composite(Vec<Value>),
}

impl Key {
    pub fn id(id: impl Into<RecordId>) -> Self {
        Key::Id(id.into())
    }

    pub fn alternate(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Key::Alternate {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn composite<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Key::Composite(values.into_iter().map(Into::into).collect())
    }

    /// Human-readable form, naming composite components by field
    pub fn describe(&self, schema: &Schema) -> String {
        match self {
            Key::Id(id) => format!("id={}", id),
            Key::Alternate { field, value } => format!("{}={}", field, value),
            Key::Composite(values) => {
                let mut out = String::new();
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let field = schema.composite_fields().get(i).copied().unwrap_or("?");
                    let _ = write!(out, "{}={}", field, value);
                }
                out
            }
        }
    }
}

/// Validated collection of one record type over a record store.
///
/// Cloning is cheap; clones share the schema and the store. Reads take the
/// store's read lock; each mutation holds the write lock across key
/// resolution and the write, so a resolved record cannot be changed or
/// removed by another caller before it is acted on.
pub struct Collection<S: RecordStore> {
    schema: Arc<Schema>,
    store: Arc<RwLock<S>>,
}

impl<S: RecordStore> Clone for Collection<S> {
    fn clone(&self) -> Self {
        Collection {
            schema: Arc::clone(&self.schema),
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: RecordStore> Collection<S> {
    // ========== CONSTRUCTOR ==========

    pub fn new(schema: Schema, store: S) -> Self {
        Self::with_shared(Arc::new(schema), Arc::new(RwLock::new(store)))
    }

    pub fn with_shared(schema: Arc<Schema>, store: Arc<RwLock<S>>) -> Self {
        Collection { schema, store }
    }

    pub fn name(&self) -> &'static str {
        self.schema.name
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn count(&self) -> usize {
        self.store.read().len()
    }

    pub fn flush(&self) -> Result<()> {
        self.store.write().flush()
    }

    // ========== CRUD OPERATIONS ==========

    /// Validate, assign identity, apply defaults and store
    pub fn create(&self, payload: &Payload) -> Result<Record> {
        let fields = self.schema.validate_create(payload)?;
        let mut store = self.store.write();
        let id = store.insert(fields)?;
        let record = store.get(&id)?;
        debug!(collection = self.name(), %id, "created");
        Ok(record)
    }

    /// Every record, or those matching `filter`, in store order
    pub fn list(&self, filter: Option<&Filter>) -> Result<Vec<Record>> {
        let records = self.store.read().scan()?;
        match filter {
            None => Ok(records),
            Some(filter) => {
                let matches = filter.apply(&self.schema, &records)?;
                debug!(
                    collection = self.name(),
                    ?filter,
                    matches = matches.len(),
                    "filtered list"
                );
                Ok(matches)
            }
        }
    }

    /// Exactly one record for `key`
    pub fn get(&self, key: &Key) -> Result<Record> {
        let store = self.store.read();
        self.resolve(&*store, key)
    }

    /// Partial update of the single record `key` resolves to
    pub fn update(&self, key: &Key, payload: &Payload) -> Result<Record> {
        let mut store = self.store.write();
        let existing = self.resolve(&*store, key)?;
        let patch = self.schema.validate_update(payload)?;

        let merged = merge(&existing, &patch);
        self.schema.validate_record(&merged)?;
        store.replace(merged.clone())?;

        debug!(
            collection = self.name(),
            id = %merged.id,
            fields = patch.len(),
            "updated"
        );
        Ok(merged)
    }

    /// Remove the single record `key` resolves to and return it
    pub fn delete(&self, key: &Key) -> Result<Record> {
        let mut store = self.store.write();
        let target = self.resolve(&*store, key)?;
        let removed = store.remove(&target.id)?;
        debug!(collection = self.name(), id = %removed.id, "deleted");
        Ok(removed)
    }

    // ========== PRIVATE HELPERS ==========

    fn resolve(&self, store: &S, key: &Key) -> Result<Record> {
        let outcome = match key {
            Key::Id(id) => store.get(id).map_err(|err| match err {
                ShelfError::NotFound(_) => self.not_found(key),
                other => other,
            }),
            Key::Alternate { field, value } => {
                let spec = self.schema.require_spec(field)?;
                if !spec.alternate_key {
                    return Err(ShelfError::invalid(
                        field.as_str(),
                        Rule::Unsupported { lookup: "point key" },
                    ));
                }
                let wanted = self.schema.check_value(field, value)?;
                let records = store.scan()?;
                let matches = lookup::find_by_fields(&records, &[(field.as_str(), wanted)]);
                self.single_match(matches, key)
            }
            Key::Composite(values) => self.resolve_composite(store, key, values),
        };

        if let Err(ShelfError::NotFound(ref what)) = outcome {
            debug!(collection = self.name(), "no match for {}", what);
        }
        outcome
    }

    fn resolve_composite(&self, store: &S, key: &Key, values: &[Value]) -> Result<Record> {
        let fields = self.schema.composite_fields();
        if fields.is_empty() || fields.len() != values.len() {
            return Err(ShelfError::invalid(
                "key",
                Rule::KeyArity {
                    expected: fields.len(),
                    actual: values.len(),
                },
            ));
        }

        let mut errors = ValidationErrors::default();
        let mut pairs = Vec::with_capacity(fields.len());
        for (field, value) in fields.iter().zip(values) {
            match self.schema.check_value(field, value) {
                Ok(checked) => pairs.push((*field, checked)),
                Err(ShelfError::InvalidInput(found)) => {
                    for violation in found.as_slice() {
                        errors.push(violation.field.clone(), violation.rule.clone());
                    }
                }
                Err(other) => return Err(other),
            }
        }
        errors.into_result(())?;

        let records = store.scan()?;
        self.single_match(lookup::find_by_fields(&records, &pairs), key)
    }

    /// Zero matches is `NotFound`, several is `AmbiguousKey`
    fn single_match(&self, mut matches: Vec<Record>, key: &Key) -> Result<Record> {
        match matches.len() {
            0 => Err(self.not_found(key)),
            1 => Ok(matches.remove(0)),
            n => Err(ShelfError::AmbiguousKey {
                key: key.describe(&self.schema),
                matches: n,
            }),
        }
    }

    fn not_found(&self, key: &Key) -> ShelfError {
        ShelfError::NotFound(format!(
            "{} record with {}",
            self.name(),
            key.describe(&self.schema)
        ))
    }
}
