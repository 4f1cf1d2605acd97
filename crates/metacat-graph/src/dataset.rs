//! Static dataset schema
//!
//! The persisted form is a single JSON document with one array per entity
//! category. It is read once at startup and turned into an
//! [`EntityGraph`](crate::EntityGraph).

use crate::entity::{Effect, Intervention, Outcome, Paper, Sample, Study};
use crate::error::GraphError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Raw dataset as persisted
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    /// Papers
    #[serde(default)]
    pub papers: Vec<Paper>,
    /// Studies
    #[serde(default)]
    pub studies: Vec<Study>,
    /// Samples
    #[serde(default)]
    pub samples: Vec<Sample>,
    /// Interventions
    #[serde(default)]
    pub interventions: Vec<Intervention>,
    /// Outcomes
    #[serde(default)]
    pub outcomes: Vec<Outcome>,
    /// Effects
    #[serde(default)]
    pub effects: Vec<Effect>,
}

impl Dataset {
    /// Parse a dataset from JSON text
    ///
    /// # Errors
    /// `GraphError::Parse` if the text does not match the schema
    pub fn from_json_str(json: &str) -> Result<Self, GraphError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a dataset file
    ///
    /// # Errors
    /// `GraphError::Io` if the file cannot be read, `GraphError::Parse` if
    /// its content does not match the schema
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, GraphError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| GraphError::io_error(path, e))?;
        let dataset = Self::from_json_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            papers = dataset.papers.len(),
            effects = dataset.effects.len(),
            "dataset read"
        );
        Ok(dataset)
    }
}
