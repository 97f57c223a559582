// Field-level validation failures

use std::fmt;

use serde::Serialize;

/// The constraint a field value broke
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Required field missing from a create payload
    Required,
    /// Required field explicitly set to null
    NotNull,
    /// Value has the wrong JSON type
    Type { expected: &'static str },
    MinLength { min: usize },
    MaxLength { max: usize },
    /// Numeric value outside its closed range
    Range { min: Option<f64>, max: Option<f64> },
    /// Field is not declared on the record type
    UnknownField,
    /// Field does not declare the requested lookup mode
    Unsupported { lookup: &'static str },
    /// Composite key has the wrong number of components
    KeyArity { expected: usize, actual: usize },
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::Required => write!(f, "field is required"),
            Rule::NotNull => write!(f, "field may not be null"),
            Rule::Type { expected } => write!(f, "expected {}", expected),
            Rule::MinLength { min } => write!(f, "must be at least {} characters", min),
            Rule::MaxLength { max } => write!(f, "must be at most {} characters", max),
            Rule::Range { min: Some(min), max: Some(max) } => {
                write!(f, "must be between {} and {}", min, max)
            }
            Rule::Range { min: Some(min), max: None } => write!(f, "must be at least {}", min),
            Rule::Range { min: None, max: Some(max) } => write!(f, "must be at most {}", max),
            Rule::Range { min: None, max: None } => write!(f, "out of range"),
            Rule::UnknownField => write!(f, "unknown field"),
            Rule::Unsupported { lookup } => write!(f, "{} lookup is not declared", lookup),
            Rule::KeyArity { expected, actual } => {
                write!(f, "key needs {} components, got {}", expected, actual)
            }
        }
    }
}

/// One offending field together with the rule it violated
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    #[serde(flatten)]
    pub rule: Rule,
}

impl FieldViolation {
    pub fn new(field: impl Into<String>, rule: Rule) -> Self {
        Self {
            field: field.into(),
            rule,
        }
    }
}

impl fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.rule)
    }
}

/// Every violation found in one payload, in field declaration order
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    violations: Vec<FieldViolation>,
}

impl ValidationErrors {
    pub fn push(&mut self, field: impl Into<String>, rule: Rule) {
        self.violations.push(FieldViolation::new(field, rule));
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn as_slice(&self) -> &[FieldViolation] {
        &self.violations
    }

    /// First violation recorded against `field`
    pub fn for_field(&self, field: &str) -> Option<&Rule> {
        self.violations
            .iter()
            .find(|v| v.field == field)
            .map(|v| &v.rule)
    }

    /// `Ok(value)` when nothing was recorded, `InvalidInput` otherwise
    pub fn into_result<T>(self, value: T) -> crate::error::Result<T> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(crate::error::ShelfError::InvalidInput(self))
        }
    }
}

impl From<Vec<FieldViolation>> for ValidationErrors {
    fn from(violations: Vec<FieldViolation>) -> Self {
        Self { violations }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}
