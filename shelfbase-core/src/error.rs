// shelfbase-core/src/error.rs
//! Error types shared by every shelfbase operation

use thiserror::Error;

use crate::schema::{FieldViolation, Rule, ValidationErrors};

/// Failure of a single collection or store operation.
///
/// The first three variants are the caller-facing outcomes of the engine;
/// the rest come from persistence and configuration.
#[derive(Debug, Error)]
pub enum ShelfError {
    /// One or more fields failed validation
    #[error("invalid input: {0}")]
    InvalidInput(ValidationErrors),

    /// No record matches a point or composite-key query
    #[error("not found: {0}")]
    NotFound(String),

    /// A composite or alternate key matched more than one record
    #[error("ambiguous key {key}: {matches} records match")]
    AmbiguousKey { key: String, matches: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A persisted table does not have the expected layout
    #[error("corrupted table: {0}")]
    Corruption(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ShelfError {
    /// Shorthand for a single-violation `InvalidInput`
    pub fn invalid(field: impl Into<String>, rule: Rule) -> Self {
        ShelfError::InvalidInput(ValidationErrors::from(vec![FieldViolation::new(field, rule)]))
    }

    /// Violations carried by an `InvalidInput`, empty for every other kind
    pub fn violations(&self) -> &[FieldViolation] {
        match self {
            ShelfError::InvalidInput(errors) => errors.as_slice(),
            _ => &[],
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ShelfError::NotFound(_))
    }
}

pub type Result<T> = std::result::Result<T, ShelfError>;
