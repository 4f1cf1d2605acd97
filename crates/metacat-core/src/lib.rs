//! Metacat Core
//!
//! Orchestration around the evidence catalog:
//! - Owns the statistics engine and its lifecycle status
//! - Turns the displayed effects into engine requests
//! - Decodes engine results into estimates
//! - Keeps per-analyst filtering sessions
//!
//! # Example
//!
//! ```rust,ignore
//! use metacat_core::prelude::*;
//!
//! # async fn example(graph: std::sync::Arc<metacat_graph::EntityGraph>) -> Result<(), AnalysisError> {
//! let session = Session::new(graph);
//! let orchestrator = MetaAnalysisOrchestrator::new(ProcessEngine::new(EngineConfig::default()));
//!
//! orchestrator.initialize().await?;
//! let estimate = orchestrator.run(&session.analysis_request()).await?;
//! println!("g = {:.2} [{:.2}, {:.2}]", estimate.estimate, estimate.ci_lower, estimate.ci_upper);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod decode;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod process;
pub mod request;
pub mod session;
pub mod status;

pub use config::{AnalysisConfig, EngineConfig, ExportConfig, WorkbenchConfig};
pub use decode::{decode, EggerTest, Estimate, RESULT_LEN};
pub use engine::StatsEngine;
pub use error::{AnalysisError, ConfigError, DecodeError, EngineError, SessionError};
pub use orchestrator::MetaAnalysisOrchestrator;
pub use process::ProcessEngine;
pub use request::{AnalysisRequest, EffectRow, UNSPECIFIED_SUBGROUP};
pub use session::{Session, Summary};
pub use status::{allowed_transitions, validate_transition, AnalysisStatus};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with Metacat Core
    pub use crate::{
        AnalysisError, AnalysisRequest, AnalysisStatus, EngineConfig, Estimate,
        MetaAnalysisOrchestrator, ProcessEngine, Session, StatsEngine, WorkbenchConfig,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
