// src/seed.rs
//! Starter catalogue loaded into an empty book collection

use serde_json::{json, Value};

use crate::record::Payload;

/// Create payloads for the starter books, in insertion order
pub fn books() -> Vec<Payload> {
    [
        json!({
            "title": "1984",
            "author": "George Orwell",
            "category": "Fiction",
            "description": "Dystopian novel about totalitarianism",
            "published_year": 1949,
            "rating": 4.8
        }),
        json!({
            "title": "To Kill a Mockingbird",
            "author": "Harper Lee",
            "category": "Fiction",
            "description": "Classic novel about racial injustice",
            "published_year": 1960,
            "rating": 4.9
        }),
        json!({
            "title": "The Great Gatsby",
            "author": "F. Scott Fitzgerald",
            "category": "Fiction",
            "description": "Novel set in the Jazz Age",
            "published_year": 1925,
            "rating": 4.7
        }),
        json!({
            "title": "Pride and Prejudice",
            "author": "Jane Austen",
            "category": "Romance",
            "description": "Romantic novel about manners and marriage",
            "published_year": 1813,
            "rating": 4.8
        }),
        json!({
            "title": "The Catcher in the Rye",
            "author": "J.D. Salinger",
            "category": "Fiction",
            "description": "A novel about teenage rebellion",
            "published_year": 1951
        }),
    ]
    .into_iter()
    .filter_map(|value| match value {
        Value::Object(map) => Some(map),
        _ => None,
    })
    .collect()
}
