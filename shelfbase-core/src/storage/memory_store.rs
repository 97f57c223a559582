// storage/memory_store.rs
//! In-memory record store
//!
//! Records live in an arena keyed by a monotonically increasing slot
//! number, so iteration follows insertion order while identity stays a
//! separate, generated key.
//!
//! ```text
//! RecordId --positions--> slot --slots--> Record
//! ```

use std::collections::{BTreeMap, HashMap};

use tracing::trace;

use crate::error::{Result, ShelfError};
use crate::record::{FieldMap, IdGenerator, IdStrategy, Record, RecordId};
use crate::storage::RecordStore;

#[derive(Debug, Clone)]
pub struct MemoryStore {
    /// Insertion slot -> record
    slots: BTreeMap<u64, Record>,
    /// Identity -> insertion slot
    positions: HashMap<RecordId, u64>,
    next_slot: u64,
    ids: IdGenerator,
}

impl MemoryStore {
    pub fn new(strategy: IdStrategy) -> Self {
        MemoryStore {
            slots: BTreeMap::new(),
            positions: HashMap::new(),
            next_slot: 0,
            ids: IdGenerator::new(strategy),
        }
    }

    /// Rebuild a store from previously persisted records.
    ///
    /// `last_issued` is the highest sequential id ever handed out, which may
    /// exceed every live id once records have been deleted.
    pub fn restore(strategy: IdStrategy, last_issued: u64, records: Vec<Record>) -> Result<Self> {
        let mut store = MemoryStore {
            ids: IdGenerator::resume(strategy, last_issued),
            ..MemoryStore::new(strategy)
        };
        for record in records {
            store.ids.observe(&record.id);
            store.place(record)?;
        }
        Ok(store)
    }

    /// Highest sequential id handed out so far
    pub fn last_issued(&self) -> u64 {
        self.ids.last_issued()
    }

    pub fn strategy(&self) -> IdStrategy {
        self.ids.strategy()
    }

    pub fn contains(&self, id: &RecordId) -> bool {
        self.positions.contains_key(id)
    }

    fn place(&mut self, record: Record) -> Result<()> {
        if self.positions.contains_key(&record.id) {
            return Err(ShelfError::Corruption(format!(
                "identity {} is already live",
                record.id
            )));
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        self.positions.insert(record.id.clone(), slot);
        self.slots.insert(slot, record);
        Ok(())
    }

    fn not_found(id: &RecordId) -> ShelfError {
        ShelfError::NotFound(format!("record {}", id))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(IdStrategy::default())
    }
}

impl RecordStore for MemoryStore {
    fn insert(&mut self, fields: FieldMap) -> Result<RecordId> {
        let id = self.ids.next_id();
        self.place(Record::new(id.clone(), fields))?;
        trace!(%id, "record inserted");
        Ok(id)
    }

    fn get(&self, id: &RecordId) -> Result<Record> {
        self.positions
            .get(id)
            .and_then(|slot| self.slots.get(slot))
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    fn replace(&mut self, record: Record) -> Result<()> {
        let slot = *self
            .positions
            .get(&record.id)
            .ok_or_else(|| Self::not_found(&record.id))?;
        self.slots.insert(slot, record);
        Ok(())
    }

    fn remove(&mut self, id: &RecordId) -> Result<Record> {
        let slot = self.positions.remove(id).ok_or_else(|| Self::not_found(id))?;
        self.slots.remove(&slot).ok_or_else(|| Self::not_found(id))
    }

    fn scan(&self) -> Result<Vec<Record>> {
        Ok(self.slots.values().cloned().collect())
    }

    fn len(&self) -> usize {
        self.slots.len()
    }

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(title: &str) -> FieldMap {
        let mut fields = FieldMap::new();
        fields.insert("title".to_string(), json!(title));
        fields
    }

    fn titles(store: &MemoryStore) -> Vec<String> {
        store
            .scan()
            .unwrap()
            .iter()
            .map(|r| r.get_str("title").unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let mut store = MemoryStore::new(IdStrategy::Sequential);
        assert_eq!(store.insert(fields("one")).unwrap(), RecordId::Int(1));
        assert_eq!(store.insert(fields("two")).unwrap(), RecordId::Int(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_scan_preserves_insertion_order() {
        let mut store = MemoryStore::new(IdStrategy::Uuid);
        for title in ["c", "a", "b"] {
            store.insert(fields(title)).unwrap();
        }
        assert_eq!(titles(&store), vec!["c", "a", "b"]);
    }

    #[test]
    fn test_replace_keeps_position() {
        let mut store = MemoryStore::new(IdStrategy::Sequential);
        store.insert(fields("first")).unwrap();
        let id = store.insert(fields("second")).unwrap();
        store.insert(fields("third")).unwrap();

        store.replace(Record::new(id.clone(), fields("SECOND"))).unwrap();
        assert_eq!(titles(&store), vec!["first", "SECOND", "third"]);
        assert_eq!(store.get(&id).unwrap().get_str("title"), Some("SECOND"));
    }

    #[test]
    fn test_replace_missing_is_not_found() {
        let mut store = MemoryStore::new(IdStrategy::Sequential);
        let err = store
            .replace(Record::new(RecordId::Int(9), fields("ghost")))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.is_empty());
    }

    #[test]
    fn test_remove_returns_record_and_never_reuses_id() {
        let mut store = MemoryStore::new(IdStrategy::Sequential);
        store.insert(fields("a")).unwrap();
        let b = store.insert(fields("b")).unwrap();

        let removed = store.remove(&b).unwrap();
        assert_eq!(removed.get_str("title"), Some("b"));
        assert!(store.remove(&b).unwrap_err().is_not_found());
        assert!(store.get(&b).unwrap_err().is_not_found());

        assert_eq!(store.insert(fields("c")).unwrap(), RecordId::Int(3));
    }

    #[test]
    fn test_restore_resumes_counter() {
        let records = vec![
            Record::new(RecordId::Int(2), fields("b")),
            Record::new(RecordId::Int(5), fields("e")),
        ];
        let mut store = MemoryStore::restore(IdStrategy::Sequential, 7, records).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.insert(fields("h")).unwrap(), RecordId::Int(8));
    }

    #[test]
    fn test_restore_rejects_duplicate_ids() {
        let records = vec![
            Record::new(RecordId::Int(1), fields("a")),
            Record::new(RecordId::Int(1), fields("b")),
        ];
        let err = MemoryStore::restore(IdStrategy::Sequential, 1, records).unwrap_err();
        assert!(matches!(err, ShelfError::Corruption(_)));
    }
}
