//! Error types for graph loading and export

use crate::ids::{EffectId, PaperId, StudyId};
use std::path::PathBuf;

/// Errors while loading or validating the entity graph
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Dataset file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Dataset is not valid JSON for the schema
    #[error("dataset parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two records of one category share an identifier
    #[error("duplicate {kind} id {id}")]
    DuplicateId {
        /// Record kind
        kind: &'static str,
        /// Repeated identifier
        id: String,
    },

    /// A foreign key points at a record that does not exist
    #[error("{from} {id} references missing {to} {target}")]
    DanglingReference {
        /// Kind of the referring record
        from: &'static str,
        /// Referring record
        id: String,
        /// Kind of the missing record
        to: &'static str,
        /// Missing identifier
        target: String,
    },

    /// An effect's study belongs to a different paper than the effect
    #[error("effect {effect} names paper {effect_paper} but study {study} belongs to paper {study_paper}")]
    InconsistentPaper {
        /// Offending effect
        effect: EffectId,
        /// Paper named by the effect
        effect_paper: PaperId,
        /// Study named by the effect
        study: StudyId,
        /// Paper the study belongs to
        study_paper: PaperId,
    },

    /// An effect has neither a variance nor a standard error
    #[error("effect {0} has neither variance nor standard error")]
    MissingPrecision(EffectId),

    /// A numeric effect field is non-finite or out of range
    #[error("effect {effect}: invalid {field} value {value}")]
    InvalidNumber {
        /// Offending effect
        effect: EffectId,
        /// Field name
        field: &'static str,
        /// Rejected value
        value: f64,
    },
}

impl GraphError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create dangling-reference error
    pub fn dangling(
        from: &'static str,
        id: impl ToString,
        to: &'static str,
        target: impl ToString,
    ) -> Self {
        Self::DanglingReference {
            from,
            id: id.to_string(),
            to,
            target: target.to_string(),
        }
    }
}

/// Errors while exporting records as CSV
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Record could not be serialized
    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Record did not serialize to a key/value object
    #[error("row {0} is not a record")]
    NotARecord(usize),

    /// Input CSV is malformed
    #[error("malformed csv at line {line}: {reason}")]
    Malformed {
        /// One-based line number
        line: usize,
        /// What was wrong
        reason: String,
    },
}
