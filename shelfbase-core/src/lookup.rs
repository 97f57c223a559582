// src/lookup.rs
//! Point and range queries over declared fields
//!
//! Every lookup scans the records it is given and returns the matches in
//! the same order. No match is an empty `Vec`, never an error; errors are
//! reserved for lookups a field does not declare.

use serde_json::Value;

use crate::error::{Result, ShelfError};
use crate::record::Record;
use crate::schema::{FieldSpec, Rule, Schema, TextMatch};

/// A lookup packaged for `Collection::list`
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Exact { field: String, value: Value },
    Text { field: String, needle: String },
    Range { field: String, low: f64, high: f64 },
}

impl Filter {
    pub fn exact(field: impl Into<String>, value: Value) -> Self {
        Filter::Exact {
            field: field.into(),
            value,
        }
    }

    pub fn text(field: impl Into<String>, needle: impl Into<String>) -> Self {
        Filter::Text {
            field: field.into(),
            needle: needle.into(),
        }
    }

    pub fn range(field: impl Into<String>, low: f64, high: f64) -> Self {
        Filter::Range {
            field: field.into(),
            low,
            high,
        }
    }

    pub fn apply(&self, schema: &Schema, records: &[Record]) -> Result<Vec<Record>> {
        match self {
            Filter::Exact { field, value } => find_by_exact(schema, records, field, value),
            Filter::Text { field, needle } => find_by_text(schema, records, field, needle),
            Filter::Range { field, low, high } => {
                find_by_range(schema, records, field, *low, *high)
            }
        }
    }
}

/// Case-sensitive equality. Numbers compare exactly: floats by bit
/// pattern, with no tolerance.
pub fn find_by_exact(
    schema: &Schema,
    records: &[Record],
    field: &str,
    value: &Value,
) -> Result<Vec<Record>> {
    let spec = declared(schema, field, |spec| spec.lookup.exact, "exact")?;
    let wanted = spec
        .kind
        .coerce(value)
        .map_err(|rule| ShelfError::invalid(field, rule))?;

    Ok(records
        .iter()
        .filter(|record| {
            record
                .get(field)
                .map_or(false, |stored| values_identical(stored, &wanted))
        })
        .cloned()
        .collect())
}

/// Text match in the field's declared mode
pub fn find_by_text(
    schema: &Schema,
    records: &[Record],
    field: &str,
    needle: &str,
) -> Result<Vec<Record>> {
    let spec = declared(schema, field, |spec| spec.lookup.text.is_some(), "text")?;
    let mode = spec.lookup.text.unwrap_or(TextMatch::Exact);
    let folded = needle.to_lowercase();

    Ok(records
        .iter()
        .filter(|record| match record.get_str(field) {
            Some(stored) => match mode {
                TextMatch::Exact => stored == needle,
                TextMatch::IgnoreCase => stored.to_lowercase() == folded,
                TextMatch::Contains => stored.to_lowercase().contains(&folded),
            },
            None => false,
        })
        .cloned()
        .collect())
}

/// Inclusive numeric range. An inverted range matches nothing.
pub fn find_by_range(
    schema: &Schema,
    records: &[Record],
    field: &str,
    low: f64,
    high: f64,
) -> Result<Vec<Record>> {
    declared(
        schema,
        field,
        |spec| spec.lookup.range && spec.kind.is_numeric(),
        "range",
    )?;

    Ok(records
        .iter()
        .filter(|record| {
            record
                .get_f64(field)
                .map_or(false, |n| low <= n && n <= high)
        })
        .cloned()
        .collect())
}

/// Exact-match conjunction over several fields; used for key resolution
pub(crate) fn find_by_fields(records: &[Record], pairs: &[(&str, Value)]) -> Vec<Record> {
    records
        .iter()
        .filter(|record| {
            pairs.iter().all(|(field, wanted)| {
                record
                    .get(field)
                    .map_or(false, |stored| values_identical(stored, wanted))
            })
        })
        .cloned()
        .collect()
}

/// Equality without numeric tolerance
pub(crate) fn values_identical(stored: &Value, wanted: &Value) -> bool {
    match (stored, wanted) {
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(x), Some(y)) => x == y,
            _ => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.to_bits() == y.to_bits(),
                _ => false,
            },
        },
        _ => stored == wanted,
    }
}

fn declared<'a>(
    schema: &'a Schema,
    field: &str,
    supports: impl Fn(&FieldSpec) -> bool,
    lookup: &'static str,
) -> Result<&'a FieldSpec> {
    let spec = schema.require_spec(field)?;
    if supports(spec) {
        Ok(spec)
    } else {
        Err(ShelfError::invalid(field, Rule::Unsupported { lookup }))
    }
}
