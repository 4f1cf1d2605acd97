//! Error types for Metacat Core
//!
//! Covers:
//! - Analysis preconditions (empty selection, busy, not ready)
//! - Engine lifecycle failures (boot, evaluation, closed pipe)
//! - Result decoding failures
//! - Configuration loading

use crate::status::AnalysisStatus;
use std::path::PathBuf;
use std::time::Duration;

/// Main analysis error type
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    /// The displayed effect set is empty
    #[error("no effects selected")]
    EmptySelection,

    /// Another run is in flight
    #[error("an analysis is already running")]
    Busy,

    /// The engine has not been initialized
    #[error("engine not ready (status: {0})")]
    NotReady(AnalysisStatus),

    /// Engine boot failed
    #[error("engine initialization failed: {0}")]
    InitializationFailed(#[source] EngineError),

    /// Engine evaluation failed
    #[error("engine evaluation failed: {0}")]
    Engine(#[from] EngineError),

    /// Engine returned an unusable result
    #[error("result decoding failed: {0}")]
    Decode(#[from] DecodeError),

    /// Engine did not answer in time
    #[error("{phase} timed out after {after:?}")]
    Timeout {
        /// Phase that timed out
        phase: &'static str,
        /// Configured limit
        after: Duration,
    },

    /// Status machine refused a transition
    #[error("illegal status transition {from} -> {to}")]
    IllegalTransition {
        /// Current status
        from: AnalysisStatus,
        /// Requested status
        to: AnalysisStatus,
    },
}

impl AnalysisError {
    /// Check if a later attempt may succeed without changing the input
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Busy
                | Self::Timeout { .. }
                | Self::InitializationFailed(_)
                | Self::Engine(EngineError::Failed(_) | EngineError::Io(_) | EngineError::Closed)
        )
    }

    /// Check if the run was refused before reaching the engine
    #[inline]
    #[must_use]
    pub fn is_precondition(&self) -> bool {
        matches!(self, Self::EmptySelection | Self::Busy | Self::NotReady(_))
    }
}

/// Errors raised by a statistics engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Engine process could not be started
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program name
        program: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Pipe read or write failed
    #[error("engine io error: {0}")]
    Io(#[from] std::io::Error),

    /// Engine closed its output
    #[error("engine closed its output")]
    Closed,

    /// Engine spoke something other than the protocol
    #[error("engine protocol violation: {0}")]
    Protocol(String),

    /// Engine reported an evaluation error
    #[error("engine reported: {0}")]
    Failed(String),
}

impl EngineError {
    /// Create protocol error
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }
}

/// Errors decoding the engine result vector
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    /// Vector length other than expected
    #[error("expected {expected} values, got {actual}")]
    WrongLength {
        /// Expected length
        expected: usize,
        /// Received length
        actual: usize,
    },

    /// Estimate or a bound is NaN or infinite
    #[error("{field} is not finite ({value})")]
    NonFinite {
        /// Field name
        field: &'static str,
        /// Offending value
        value: f64,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for the schema
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range
    #[error("invalid config value for {key}: {reason}")]
    Invalid {
        /// Offending key
        key: &'static str,
        /// What is wrong
        reason: String,
    },
}

impl ConfigError {
    /// Create IO error for path
    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors from session operations
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Filter input rejected
    #[error(transparent)]
    Validation(#[from] metacat_filter::ValidationErrors),

    /// CSV export failed
    #[error("export failed: {0}")]
    Export(#[from] metacat_graph::ExportError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(AnalysisError::EmptySelection.is_precondition());
        assert!(!AnalysisError::EmptySelection.is_retryable());
        assert!(AnalysisError::Busy.is_retryable());
        assert!(AnalysisError::Engine(EngineError::Closed).is_retryable());
        assert!(!AnalysisError::Engine(EngineError::protocol("junk")).is_retryable());
        let decode = AnalysisError::Decode(DecodeError::WrongLength {
            expected: 7,
            actual: 3,
        });
        assert!(!decode.is_retryable());
        assert!(!decode.is_precondition());
        assert_eq!(decode.to_string(), "result decoding failed: expected 7 values, got 3");
    }

    #[test]
    fn timeout_message() {
        let err = AnalysisError::Timeout {
            phase: "evaluation",
            after: Duration::from_secs(300),
        };
        assert_eq!(err.to_string(), "evaluation timed out after 300s");
    }
}
