// src/record.rs
use std::collections::BTreeMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::Result;

/// Name of the identity field on every record type
pub const ID_FIELD: &str = "id";

/// Declared field name -> value, ordered by field name
pub type FieldMap = BTreeMap<String, Value>;

/// Raw create/update body. A missing key is "absent", a key mapped to
/// `null` is "explicitly null".
pub type Payload = serde_json::Map<String, Value>;

/// Record identity.
/// Untagged so it appears as a plain value on the wire: `{"id": 2}` or
/// `{"id": "0b6c..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(u64),
    Uuid(String),
}

impl RecordId {
    /// Parse an identity typed by a user: digits become `Int`, anything
    /// else is taken as a token.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<u64>() {
            Ok(n) => RecordId::Int(n),
            Err(_) => RecordId::Uuid(raw.to_string()),
        }
    }

    pub fn new_uuid() -> Self {
        RecordId::Uuid(Uuid::new_v4().to_string())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Int(n) => write!(f, "{}", n),
            RecordId::Uuid(s) => write!(f, "{}", s),
        }
    }
}

impl From<u64> for RecordId {
    fn from(n: u64) -> Self {
        RecordId::Int(n)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId::parse(s)
    }
}

/// How a store mints identities
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdStrategy {
    /// 1, 2, 3, ... never reused, even after deletes
    #[default]
    Sequential,
    /// Random v4 UUID tokens
    Uuid,
}

/// Identity source owned by a record store
#[derive(Debug, Clone)]
pub struct IdGenerator {
    strategy: IdStrategy,
    last_issued: u64,
}

impl IdGenerator {
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            strategy,
            last_issued: 0,
        }
    }

    /// Resume a sequential counter after `last_issued`
    pub fn resume(strategy: IdStrategy, last_issued: u64) -> Self {
        Self {
            strategy,
            last_issued,
        }
    }

    pub fn strategy(&self) -> IdStrategy {
        self.strategy
    }

    /// Highest sequential id handed out so far
    pub fn last_issued(&self) -> u64 {
        self.last_issued
    }

    pub fn next_id(&mut self) -> RecordId {
        match self.strategy {
            IdStrategy::Sequential => {
                self.last_issued += 1;
                RecordId::Int(self.last_issued)
            }
            IdStrategy::Uuid => RecordId::new_uuid(),
        }
    }

    /// Account for an identity loaded from elsewhere so it is never issued again
    pub fn observe(&mut self, id: &RecordId) {
        if let RecordId::Int(n) = id {
            if *n > self.last_issued {
                self.last_issued = *n;
            }
        }
    }
}

/// A stored record: identity plus one value per declared field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,

    #[serde(flatten)]
    pub fields: FieldMap,
}

impl Record {
    pub fn new(id: RecordId, fields: FieldMap) -> Self {
        Record { id, fields }
    }

    /// Field value; the identity is not a field and yields `None`
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(Value::as_str)
    }

    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(Value::as_f64)
    }

    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Decode into a typed view such as [`crate::Book`]
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.to_value()?)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_untagged_serde() {
        assert_eq!(serde_json::to_value(RecordId::Int(3)).unwrap(), json!(3));
        assert_eq!(
            serde_json::from_value::<RecordId>(json!("abc-123")).unwrap(),
            RecordId::Uuid("abc-123".to_string())
        );
        assert_eq!(
            serde_json::from_value::<RecordId>(json!(42)).unwrap(),
            RecordId::Int(42)
        );
    }

    #[test]
    fn test_record_id_parse() {
        assert_eq!(RecordId::parse("17"), RecordId::Int(17));
        assert_eq!(
            RecordId::parse("5f0c-aa"),
            RecordId::Uuid("5f0c-aa".to_string())
        );
    }

    #[test]
    fn test_sequential_generator_never_reuses() {
        let mut ids = IdGenerator::new(IdStrategy::Sequential);
        assert_eq!(ids.next_id(), RecordId::Int(1));
        assert_eq!(ids.next_id(), RecordId::Int(2));

        ids.observe(&RecordId::Int(10));
        assert_eq!(ids.next_id(), RecordId::Int(11));

        ids.observe(&RecordId::Int(4));
        assert_eq!(ids.next_id(), RecordId::Int(12));
    }

    #[test]
    fn test_uuid_generator_yields_distinct_tokens() {
        let mut ids = IdGenerator::new(IdStrategy::Uuid);
        let a = ids.next_id();
        let b = ids.next_id();
        assert_ne!(a, b);
        assert!(matches!(a, RecordId::Uuid(ref s) if !s.is_empty()));
    }

    #[test]
    fn test_record_flattens_fields() {
        let mut fields = FieldMap::new();
        fields.insert("title".to_string(), json!("1984"));
        let record = Record::new(RecordId::Int(1), fields);

        let value = record.to_value().unwrap();
        assert_eq!(value, json!({"id": 1, "title": "1984"}));

        let back: Record = serde_json::from_value(value).unwrap();
        assert_eq!(back, record);
        assert!(back.get(ID_FIELD).is_none());
    }

    #[test]
    fn test_id_strategy_from_config_string() {
        let strategy: IdStrategy = serde_json::from_value(json!("uuid")).unwrap();
        assert_eq!(strategy, IdStrategy::Uuid);
    }
}
