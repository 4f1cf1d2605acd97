//! Metacat Entity Graph
//!
//! In-memory relational view of the evidence database: papers, the studies
//! they report, the effects extracted from those studies, and the
//! intervention and outcome facets each effect is tagged with.
//!
//! # Core Concepts
//!
//! - [`EntityGraph`]: validated, immutable view built once per session
//! - [`Dataset`]: persisted JSON schema the graph is loaded from
//! - [`TagSet`]: multi-valued facet (semicolon-joined when persisted)
//! - [`Category`] / [`Field`]: the catalogue of filterable fields
//! - [`Record`]: uniform field access used by the filter layer
//! - [`to_csv`]: CSV export of any record list
//!
//! # Example
//!
//! ```rust,ignore
//! use metacat_graph::{Category, EntityGraph};
//!
//! let graph = EntityGraph::from_path("data/effects.json")?;
//! println!("{} effects", graph.count(Category::Effect));
//! ```

#![warn(unreachable_pub)]

mod category;
mod dataset;
mod entity;
mod error;
mod export;
mod graph;
mod ids;
mod record;
mod tags;

pub use category::{Category, Field, FieldKind, UnknownName};
pub use dataset::Dataset;
pub use entity::{ArmSizes, Effect, Intervention, Outcome, Paper, Sample, Study};
pub use error::{ExportError, GraphError};
pub use export::{parse_csv, read_records, to_csv};
pub use graph::{EntityGraph, FieldDomain};
pub use ids::{EffectId, InterventionId, OutcomeId, PaperId, SampleId, StudyId};
pub use record::Record;
pub use tags::{TagSet, FLAG_NO, FLAG_YES, TAG_SEPARATOR};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
