//! Validation issues collected while resolving and composing a platform config
//!
//! Stages return a [`ComposeValidation`], which collects every issue instead
//! of stopping at the first, so a single run surfaces every violated field.

use super::codes::ErrorCode;
use serde::Serialize;
use std::fmt;
use stillwater::Validation;
use thiserror::Error;

/// Result of a stage that reports all of its issues together
pub type ComposeValidation<T> = Validation<T, Vec<ValidationError>>;

/// `Success(value)` when nothing was recorded, otherwise every issue
pub fn validated<T>(value: T, errors: Vec<ValidationError>) -> ComposeValidation<T> {
    if errors.is_empty() {
        Validation::success(value)
    } else {
        Validation::failure(errors)
    }
}

/// Keep the success value, moving any issues into `errors`
pub fn collect_into<T>(
    errors: &mut Vec<ValidationError>,
    validation: ComposeValidation<T>,
) -> Option<T> {
    match validation {
        Validation::Success(value) => Some(value),
        Validation::Failure(issues) => {
            errors.extend(issues);
            None
        }
    }
}

/// Category of a validation issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationKind {
    Format,
    Dependency,
    Range,
}

impl fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Format => write!(f, "format"),
            Self::Dependency => write!(f, "dependency"),
            Self::Range => write!(f, "range"),
        }
    }
}

/// A single violated rule, naming the offending field
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationError {
    /// An identifier, URI or expression does not match its pattern
    #[error("'{field}' value '{value}' does not match {expected}")]
    Format {
        field: String,
        value: String,
        expected: String,
    },

    /// A feature is enabled but a value it needs is absent
    #[error("'{field}' is required when {required_by}")]
    Dependency { field: String, required_by: String },

    /// A numeric value falls outside its allowed bounds
    #[error("'{field}' value {value} is outside the allowed range [{min}, {max}]")]
    Range {
        field: String,
        value: u64,
        min: u64,
        max: u64,
    },
}

impl ValidationError {
    pub fn format(
        field: impl Into<String>,
        value: impl Into<String>,
        expected: impl Into<String>,
    ) -> Self {
        Self::Format {
            field: field.into(),
            value: value.into(),
            expected: expected.into(),
        }
    }

    pub fn dependency(field: impl Into<String>, required_by: impl Into<String>) -> Self {
        Self::Dependency {
            field: field.into(),
            required_by: required_by.into(),
        }
    }

    pub fn range(field: impl Into<String>, value: u64, min: u64, max: u64) -> Self {
        Self::Range {
            field: field.into(),
            value,
            min,
            max,
        }
    }

    /// Name of the configuration field this issue is about
    pub fn field(&self) -> &str {
        match self {
            Self::Format { field, .. }
            | Self::Dependency { field, .. }
            | Self::Range { field, .. } => field,
        }
    }

    pub fn kind(&self) -> ValidationKind {
        match self {
            Self::Format { .. } => ValidationKind::Format,
            Self::Dependency { .. } => ValidationKind::Dependency,
            Self::Range { .. } => ValidationKind::Range,
        }
    }

    pub fn code(&self) -> u16 {
        match self {
            Self::Format { .. } => ErrorCode::VALIDATION_PATTERN_MISMATCH,
            Self::Dependency { .. } => ErrorCode::VALIDATION_DEPENDENCY_MISSING,
            Self::Range { .. } => ErrorCode::VALIDATION_OUT_OF_RANGE,
        }
    }
}

/// Every issue of a failed plan, in the order the stages found them
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    /// True when some issue names `field`
    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|e| e.field() == field)
    }

    pub fn of_kind(&self, kind: ValidationKind) -> impl Iterator<Item = &ValidationError> {
        self.0.iter().filter(move |e| e.kind() == kind)
    }
}

impl From<Vec<ValidationError>> for ValidationErrors {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self(errors)
    }
}

impl From<ValidationError> for ValidationErrors {
    fn from(error: ValidationError) -> Self {
        Self(vec![error])
    }
}

impl IntoIterator for ValidationErrors {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines = self
            .0
            .iter()
            .map(|e| format!("  - [E{:04} {}] {}", e.code(), e.kind(), e))
            .collect::<Vec<_>>()
            .join("\n");
        write!(f, "{}", lines)
    }
}

impl std::error::Error for ValidationErrors {}
