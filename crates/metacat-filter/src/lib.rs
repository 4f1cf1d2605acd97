//! Metacat Filter
//!
//! Cascading filters over the entity graph.
//!
//! # Core Concepts
//!
//! - [`Predicate`]: range, threshold or any-of test over one field
//! - [`PredicateGroup`]: the conjunction of predicates for one category
//! - [`FilterSpec`]: one group per category
//! - [`FilterEngine`]: evaluates a spec into per-category [`Subsets`]
//! - [`propagate`]: merges fresh subsets with locked ones into the displayed view
//! - [`FilterForm`]: raw user input, validated into a [`PredicateGroup`]
//!
//! # Example
//!
//! ```rust,ignore
//! use metacat_filter::{propagate, FilterEngine, FilterSpec, LockMap, Subsets};
//!
//! let spec = FilterSpec::identity(&graph);
//! let fresh = FilterEngine::new(&graph).apply(&spec);
//! let shown = propagate(&graph, &fresh, &Subsets::full(&graph), &LockMap::new());
//! ```

#![warn(unreachable_pub)]

mod engine;
mod error;
mod form;
mod lock;
mod predicate;
mod spec;
mod subset;

pub use engine::FilterEngine;
pub use error::{FieldError, FilterFileError, ValidationError, ValidationErrors};
pub use form::{FilterForm, FilterForms, RawPredicate, RawValue};
pub use lock::{propagate, Lock, LockMap, Resolution};
pub use predicate::{Predicate, PredicateGroup};
pub use spec::FilterSpec;
pub use subset::Subsets;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
