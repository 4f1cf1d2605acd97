//! Validation errors for filter input
//!
//! Validation happens before anything reaches the engine. A submission that
//! fails validation never changes the displayed dataset.

use metacat_graph::{Category, Field, FieldKind};
use std::fmt;
use std::path::PathBuf;

/// A single rejected predicate
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    /// Field name not in the catalogue
    #[error("unknown field '{0}'")]
    UnknownField(String),

    /// Field belongs to a different category
    #[error("field {field} belongs to {actual}, not {expected}")]
    WrongCategory {
        /// Submitted field
        field: Field,
        /// Category of the form
        expected: Category,
        /// Category the field belongs to
        actual: Category,
    },

    /// Predicate kind does not fit the field
    #[error("field {field} takes a {expected:?} predicate")]
    KindMismatch {
        /// Submitted field
        field: Field,
        /// Kind the field takes
        expected: FieldKind,
    },

    /// Bound is not a number
    #[error("'{0}' is not a number")]
    NotNumeric(String),

    /// Bound is NaN or infinite
    #[error("bound must be finite, got {0}")]
    NonFinite(f64),

    /// Lower bound above upper bound
    #[error("range is inverted: {min} > {max}")]
    InvertedRange {
        /// Lower bound
        min: f64,
        /// Upper bound
        max: f64,
    },

    /// Threshold is zero, negative, or fractional
    #[error("threshold must be a positive whole number, got '{0}'")]
    InvalidThreshold(String),

    /// Tag outside the field's option set
    #[error("'{tag}' is not an option of {field}")]
    UnknownOption {
        /// Submitted field
        field: Field,
        /// Rejected tag
        tag: String,
    },

    /// Field given more than once in one submission
    #[error("field {0} given more than once")]
    DuplicateField(Field),
}

/// A rejected predicate with its location
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    /// Category of the form
    pub category: Category,
    /// Field name as submitted
    pub field: String,
    /// What was wrong
    pub error: ValidationError,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}: {}", self.category, self.field, self.error)
    }
}

/// All field errors of one submission
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Empty error list
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error
    pub fn push(&mut self, category: Category, field: impl Into<String>, error: ValidationError) {
        self.errors.push(FieldError {
            category,
            field: field.into(),
            error,
        });
    }

    /// Merge another error list
    pub fn extend(&mut self, other: ValidationErrors) {
        self.errors.extend(other.errors);
    }

    /// True if nothing was rejected
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of rejected predicates
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Rejected predicates in submission order
    #[inline]
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Errors for one field name
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors.iter().filter(move |e| e.field == field)
    }

    /// `Ok(())` if empty, otherwise `Err(self)`
    ///
    /// # Errors
    /// Returns `self` when at least one error was recorded
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} invalid filter field(s)", self.errors.len())?;
        for e in &self.errors {
            write!(f, "; {e}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Errors reading a filter file
#[derive(Debug, thiserror::Error)]
pub enum FilterFileError {
    /// File could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for the schema
    #[error("filter file parse error: {0}")]
    Toml(#[from] toml::de::Error),
}
