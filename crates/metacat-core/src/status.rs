//! Analysis lifecycle status
//!
//! ```text
//! Uninitialized -> Initializing -> Ready <-> Running
//!                      |                      |
//!                      v                      v
//!                Uninitialized    Error -> Ready
//! ```

use crate::error::AnalysisError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of the statistics engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    /// Engine not started
    Uninitialized,
    /// Engine booting
    Initializing,
    /// Engine idle and usable
    Ready,
    /// Analysis in flight
    Running,
    /// Last run failed; passes straight back to Ready
    Error,
}

impl AnalysisStatus {
    /// All states
    pub const ALL: [AnalysisStatus; 5] = [
        AnalysisStatus::Uninitialized,
        AnalysisStatus::Initializing,
        AnalysisStatus::Ready,
        AnalysisStatus::Running,
        AnalysisStatus::Error,
    ];

    /// True once the engine has booted
    #[inline]
    #[must_use]
    pub fn is_initialized(self) -> bool {
        matches!(self, Self::Ready | Self::Running | Self::Error)
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Error => "error",
        })
    }
}

/// States reachable in one step
#[must_use]
pub fn allowed_transitions(from: AnalysisStatus) -> Vec<AnalysisStatus> {
    use AnalysisStatus::{Error, Initializing, Ready, Running, Uninitialized};
    match from {
        Uninitialized => vec![Initializing],
        Initializing => vec![Ready, Uninitialized],
        Ready => vec![Running],
        Running => vec![Ready, Error],
        Error => vec![Ready],
    }
}

/// Validate a status transition
///
/// # Errors
/// `AnalysisError::IllegalTransition` if `to` is not reachable from `from`
pub fn validate_transition(from: AnalysisStatus, to: AnalysisStatus) -> Result<(), AnalysisError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(AnalysisError::IllegalTransition { from, to })
    }
}
