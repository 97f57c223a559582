// src/merge.rs
use crate::record::{Record, ID_FIELD};
use crate::schema::Patch;

/// Apply a validated partial update to a copy of `existing`.
///
/// Fields present in the patch replace the stored value, absent fields
/// keep it. The identity is never touched. Pure: the caller decides
/// whether the result is written back.
pub fn merge(existing: &Record, patch: &Patch) -> Record {
    let mut merged = existing.clone();
    for (field, value) in patch.iter() {
        if field == ID_FIELD {
            continue;
        }
        merged.fields.insert(field.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Book;
    use crate::record::{IdStrategy, Payload, RecordId};
    use serde_json::{json, Value};

    fn stored_book() -> (crate::Schema, Record) {
        let schema = Book::schema(IdStrategy::Uuid);
        let payload: Payload = match json!({
            "title": "1984",
            "author": "George Orwell",
            "rating": 4.8
        }) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let fields = schema.validate_create(&payload).unwrap();
        (schema, Record::new(RecordId::Uuid("b-1".to_string()), fields))
    }

    #[test]
    fn test_empty_patch_is_identity() {
        let (_, record) = stored_book();
        assert_eq!(merge(&record, &Patch::default()), record);
    }

    #[test]
    fn test_present_fields_overwrite() {
        let (schema, record) = stored_book();
        let patch = schema
            .validate_update(&serde_json::from_value(json!({"rating": 4.9})).unwrap())
            .unwrap();

        let merged = merge(&record, &patch);
        assert_eq!(merged.get("rating"), Some(&json!(4.9)));
        assert_eq!(merged.get("title"), Some(&json!("1984")));
        assert_eq!(merged.id, record.id);
    }

    #[test]
    fn test_identity_survives_patch_with_id() {
        let (schema, record) = stored_book();
        let patch = schema
            .validate_update(&serde_json::from_value(json!({"id": "other", "title": "Nineteen"})).unwrap())
            .unwrap();

        let merged = merge(&record, &patch);
        assert_eq!(merged.id, RecordId::Uuid("b-1".to_string()));
        assert_eq!(merged.get_str("title"), Some("Nineteen"));
        assert!(merged.get(ID_FIELD).is_none());
    }

    #[test]
    fn test_merge_leaves_existing_untouched() {
        let (schema, record) = stored_book();
        let before = record.clone();
        let patch = schema
            .validate_update(&serde_json::from_value(json!({"category": "Dystopia"})).unwrap())
            .unwrap();
        let _ = merge(&record, &patch);
        assert_eq!(record, before);
    }
}
