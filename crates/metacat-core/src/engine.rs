//! Statistics engine seam
//!
//! The orchestrator never fits a model itself. It boots an engine once and
//! hands it one request at a time.

use crate::error::EngineError;
use crate::request::AnalysisRequest;
use async_trait::async_trait;
use std::sync::Arc;

/// An external meta-analysis engine
///
/// Implementations need not be re-entrant; the orchestrator guarantees at
/// most one `evaluate` in flight.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StatsEngine: Send + Sync {
    /// Start the engine and wait until it can take requests
    async fn boot(&self) -> Result<(), EngineError>;

    /// Evaluate one request, returning the raw result vector
    async fn evaluate(&self, request: &AnalysisRequest) -> Result<Vec<f64>, EngineError>;
}

#[async_trait]
impl<E: StatsEngine + ?Sized> StatsEngine for Arc<E> {
    async fn boot(&self) -> Result<(), EngineError> {
        (**self).boot().await
    }

    async fn evaluate(&self, request: &AnalysisRequest) -> Result<Vec<f64>, EngineError> {
        (**self).evaluate(request).await
    }
}

#[async_trait]
impl<E: StatsEngine + ?Sized> StatsEngine for Box<E> {
    async fn boot(&self) -> Result<(), EngineError> {
        (**self).boot().await
    }

    async fn evaluate(&self, request: &AnalysisRequest) -> Result<Vec<f64>, EngineError> {
        (**self).evaluate(request).await
    }
}
