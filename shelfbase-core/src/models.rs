// src/models.rs
//! The two record types: books and todo items
//!
//! Each type provides its [`Schema`] and a typed view decoded from a
//! stored [`crate::Record`].

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::record::{IdStrategy, RecordId};
use crate::schema::{FieldSpec, Schema, TextMatch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: RecordId,
    pub title: String,
    pub author: String,
    pub category: Option<String>,
    pub description: Option<String>,
    pub published_year: Option<i64>,
    pub rating: Option<f64>,
}

impl Book {
    pub const COLLECTION: &'static str = "books";

    /// Title and author are addressed together for update/delete and need
    /// not be unique.
    pub fn schema(identity: IdStrategy) -> Schema {
        Schema::new(Self::COLLECTION, identity)
            .field(
                FieldSpec::text("title", Some(3), Some(200))
                    .required()
                    .alternate_key()
                    .text_lookup(TextMatch::Exact),
            )
            .field(
                FieldSpec::text("author", Some(3), Some(100))
                    .required()
                    .text_lookup(TextMatch::Contains),
            )
            .field(FieldSpec::text("category", Some(1), Some(50)).text_lookup(TextMatch::IgnoreCase))
            .field(FieldSpec::text("description", None, None))
            .field(
                FieldSpec::integer("published_year", None, None)
                    .exact_lookup()
                    .range_lookup(),
            )
            .field(
                FieldSpec::float("rating", Some(0.0), Some(5.0))
                    .exact_lookup()
                    .range_lookup(),
            )
            .composite_key(&["title", "author"])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Todo {
    pub id: RecordId,
    pub title: String,
    pub description: Option<String>,
    pub priority: u8,
    pub complete: bool,
}

impl Todo {
    pub const COLLECTION: &'static str = "todos";

    pub fn schema(identity: IdStrategy) -> Schema {
        Schema::new(Self::COLLECTION, identity)
            .field(
                FieldSpec::text("title", Some(3), None)
                    .required()
                    .text_lookup(TextMatch::Contains),
            )
            .field(FieldSpec::text("description", None, Some(100)))
            .field(
                FieldSpec::integer("priority", Some(1), Some(5))
                    .required()
                    .exact_lookup()
                    .range_lookup(),
            )
            .field(
                FieldSpec::boolean("complete")
                    .default_value(json!(false))
                    .exact_lookup(),
            )
    }
}
