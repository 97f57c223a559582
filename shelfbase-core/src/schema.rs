// src/schema.rs
//! Declared record shapes and the validator that enforces them
//!
//! A [`Schema`] lists every field of a record type together with its
//! value kind, whether it is required at creation, and which lookups it
//! supports. The same declaration drives validation of create payloads,
//! partial-update payloads and whole stored records.

mod violation;

use serde_json::Value;
use tracing::warn;

use crate::error::Result;
use crate::record::{FieldMap, IdStrategy, Payload, Record, ID_FIELD};

pub use self::violation::{FieldViolation, Rule, ValidationErrors};

/// Value kind and constraints of a field
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    /// Length bounds are counted in characters
    Text {
        min_len: Option<usize>,
        max_len: Option<usize>,
    },
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Float {
        min: Option<f64>,
        max: Option<f64>,
    },
    Boolean,
}

impl FieldKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "string",
            FieldKind::Integer { .. } => "integer",
            FieldKind::Float { .. } => "number",
            FieldKind::Boolean => "boolean",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldKind::Integer { .. } | FieldKind::Float { .. })
    }

    /// Type check only. Returns the value in its stored form: integers
    /// given to float fields become floats, integral floats given to
    /// integer fields become integers.
    pub fn coerce(&self, value: &Value) -> std::result::Result<Value, Rule> {
        let mismatch = || Rule::Type {
            expected: self.type_name(),
        };
        match self {
            FieldKind::Text { .. } => match value {
                Value::String(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
            FieldKind::Integer { .. } => {
                if let Some(n) = value.as_i64() {
                    return Ok(Value::from(n));
                }
                match value.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                        Ok(Value::from(f as i64))
                    }
                    _ => Err(mismatch()),
                }
            }
            FieldKind::Float { .. } => value.as_f64().map(Value::from).ok_or_else(mismatch),
            FieldKind::Boolean => match value {
                Value::Bool(_) => Ok(value.clone()),
                _ => Err(mismatch()),
            },
        }
    }

    /// Type check plus the kind's constraints
    pub fn check(&self, value: &Value) -> std::result::Result<Value, Rule> {
        let value = self.coerce(value)?;
        match self {
            FieldKind::Text { min_len, max_len } => {
                let len = value.as_str().map(|s| s.chars().count()).unwrap_or(0);
                if let Some(min) = *min_len {
                    if len < min {
                        return Err(Rule::MinLength { min });
                    }
                }
                if let Some(max) = *max_len {
                    if len > max {
                        return Err(Rule::MaxLength { max });
                    }
                }
            }
            FieldKind::Integer { min, max } => {
                let n = value.as_i64().unwrap_or_default();
                let below = min.map_or(false, |m| n < m);
                let above = max.map_or(false, |m| n > m);
                if below || above {
                    return Err(Rule::Range {
                        min: min.map(|m| m as f64),
                        max: max.map(|m| m as f64),
                    });
                }
            }
            FieldKind::Float { min, max } => {
                let f = value.as_f64().unwrap_or_default();
                let below = min.map_or(false, |m| f < m);
                let above = max.map_or(false, |m| f > m);
                if below || above {
                    return Err(Rule::Range {
                        min: *min,
                        max: *max,
                    });
                }
            }
            FieldKind::Boolean => {}
        }
        Ok(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Presence {
    /// Must be supplied at creation and may never be null
    Required,
    /// May be absent at creation; `default` is stored instead
    Optional { default: Value },
}

/// Text matching mode a field declares for `find_by_text`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextMatch {
    /// Case-sensitive equality
    Exact,
    /// Case-insensitive equality
    IgnoreCase,
    /// Case-insensitive substring containment
    Contains,
}

/// Lookups a field answers
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LookupModes {
    pub exact: bool,
    pub text: Option<TextMatch>,
    pub range: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub presence: Presence,
    pub lookup: LookupModes,
    /// Usable as a single-field point key for `get`
    pub alternate_key: bool,
}

impl FieldSpec {
    fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            presence: Presence::Optional {
                default: Value::Null,
            },
            lookup: LookupModes::default(),
            alternate_key: false,
        }
    }

    pub fn text(name: &'static str, min_len: Option<usize>, max_len: Option<usize>) -> Self {
        Self::new(name, FieldKind::Text { min_len, max_len })
    }

    pub fn integer(name: &'static str, min: Option<i64>, max: Option<i64>) -> Self {
        Self::new(name, FieldKind::Integer { min, max })
    }

    pub fn float(name: &'static str, min: Option<f64>, max: Option<f64>) -> Self {
        Self::new(name, FieldKind::Float { min, max })
    }

    pub fn boolean(name: &'static str) -> Self {
        Self::new(name, FieldKind::Boolean)
    }

    pub fn required(mut self) -> Self {
        self.presence = Presence::Required;
        self
    }

    pub fn default_value(mut self, default: Value) -> Self {
        self.presence = Presence::Optional { default };
        self
    }

    pub fn exact_lookup(mut self) -> Self {
        self.lookup.exact = true;
        self
    }

    pub fn text_lookup(mut self, mode: TextMatch) -> Self {
        self.lookup.text = Some(mode);
        self
    }

    pub fn range_lookup(mut self) -> Self {
        self.lookup.range = true;
        self
    }

    /// Point key for `get`; implies exact lookup. Uniqueness is not
    /// enforced: a key matching several records resolves to `AmbiguousKey`.
    pub fn alternate_key(mut self) -> Self {
        self.alternate_key = true;
        self.lookup.exact = true;
        self
    }

    pub fn is_required(&self) -> bool {
        self.presence == Presence::Required
    }

    /// Check a value that is present in a payload or record
    fn check_present(&self, value: &Value) -> std::result::Result<Value, Rule> {
        match value {
            Value::Null if self.is_required() => Err(Rule::NotNull),
            Value::Null => Ok(Value::Null),
            other => self.kind.check(other),
        }
    }
}

/// Validated partial update: only the fields the caller supplied
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Patch {
    fields: FieldMap,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }
}

/// Declared shape of one record type
#[derive(Clone, Debug)]
pub struct Schema {
    pub name: &'static str,
    pub identity: IdStrategy,
    fields: Vec<FieldSpec>,
    composite_key: Vec<&'static str>,
}

impl Schema {
    pub fn new(name: &'static str, identity: IdStrategy) -> Self {
        Self {
            name,
            identity,
            fields: Vec::new(),
            composite_key: Vec::new(),
        }
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    /// Declare the ordered fields that address a record for update/delete
    pub fn composite_key(mut self, fields: &[&'static str]) -> Self {
        self.composite_key = fields.to_vec();
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn composite_fields(&self) -> &[&'static str] {
        &self.composite_key
    }

    pub fn spec(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|spec| spec.name == name)
    }

    /// Field declaration, or `InvalidInput(UnknownField)`
    pub fn require_spec(&self, name: &str) -> Result<&FieldSpec> {
        self.spec(name)
            .ok_or_else(|| crate::ShelfError::invalid(name, Rule::UnknownField))
    }

    /// Check a single value against a field's full rule set
    pub fn check_value(&self, field: &str, value: &Value) -> Result<Value> {
        let spec = self.require_spec(field)?;
        spec.check_present(value)
            .map_err(|rule| crate::ShelfError::invalid(field, rule))
    }

    // ========== CREATE / UPDATE VALIDATION ==========

    /// Validate a create payload and fill optional defaults.
    ///
    /// A caller-supplied identity is dropped; the store assigns one.
    pub fn validate_create(&self, payload: &Payload) -> Result<FieldMap> {
        let mut errors = self.unknown_fields(payload);
        let mut fields = FieldMap::new();

        for spec in &self.fields {
            match (payload.get(spec.name), &spec.presence) {
                (None, Presence::Required) => errors.push(spec.name, Rule::Required),
                (None, Presence::Optional { default }) => {
                    fields.insert(spec.name.to_string(), default.clone());
                }
                (Some(value), _) => match spec.check_present(value) {
                    Ok(value) => {
                        fields.insert(spec.name.to_string(), value);
                    }
                    Err(rule) => errors.push(spec.name, rule),
                },
            }
        }

        errors.into_result(fields)
    }

    /// Validate a partial payload. Only present fields are checked;
    /// absent fields are neither defaulted nor rejected. Explicit `null`
    /// clears an optional field.
    pub fn validate_update(&self, payload: &Payload) -> Result<Patch> {
        let mut errors = self.unknown_fields(payload);
        let mut fields = FieldMap::new();

        for spec in &self.fields {
            if let Some(value) = payload.get(spec.name) {
                match spec.check_present(value) {
                    Ok(value) => {
                        fields.insert(spec.name.to_string(), value);
                    }
                    Err(rule) => errors.push(spec.name, rule),
                }
            }
        }

        errors.into_result(Patch { fields })
    }

    /// Re-check a complete stored record
    pub fn validate_record(&self, record: &Record) -> Result<()> {
        let mut errors = ValidationErrors::default();
        for name in record.fields.keys() {
            if self.spec(name).is_none() {
                errors.push(name.clone(), Rule::UnknownField);
            }
        }
        for spec in &self.fields {
            match record.get(spec.name) {
                None => errors.push(spec.name, Rule::Required),
                Some(value) => {
                    if let Err(rule) = spec.check_present(value) {
                        errors.push(spec.name, rule);
                    }
                }
            }
        }
        errors.into_result(())
    }

    fn unknown_fields(&self, payload: &Payload) -> ValidationErrors {
        let mut errors = ValidationErrors::default();
        for name in payload.keys() {
            if name == ID_FIELD {
                warn!(collection = self.name, "ignoring caller-supplied identity");
                continue;
            }
            if self.spec(name).is_none() {
                errors.push(name.clone(), Rule::UnknownField);
            }
        }
        errors
    }
}
