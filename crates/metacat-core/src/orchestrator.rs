//! Meta-analysis orchestrator
//!
//! Owns one [`StatsEngine`] and its lifecycle status. The status lives in a
//! `watch` channel so callers can observe transitions, and every
//! check-and-set goes through `send_if_modified` so two callers can never
//! both claim the engine.

use crate::config::AnalysisConfig;
use crate::decode::{decode, Estimate};
use crate::engine::StatsEngine;
use crate::error::AnalysisError;
use crate::request::AnalysisRequest;
use crate::status::{validate_transition, AnalysisStatus};
use parking_lot::RwLock;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Restores a status if the owning future is dropped mid-flight
struct StatusGuard<'a> {
    status: &'a watch::Sender<AnalysisStatus>,
    from: AnalysisStatus,
    to: AnalysisStatus,
    armed: bool,
}

impl<'a> StatusGuard<'a> {
    fn new(status: &'a watch::Sender<AnalysisStatus>, from: AnalysisStatus, to: AnalysisStatus) -> Self {
        Self {
            status,
            from,
            to,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let (from, to) = (self.from, self.to);
        let restored = self.status.send_if_modified(|s| {
            if *s == from {
                *s = to;
                true
            } else {
                false
            }
        });
        if restored {
            tracing::debug!(%from, %to, "status restored after cancellation");
        }
    }
}

/// Drives the statistics engine through its lifecycle
#[derive(Debug)]
pub struct MetaAnalysisOrchestrator<E> {
    engine: E,
    init_timeout: Duration,
    run_timeout: Duration,
    status: watch::Sender<AnalysisStatus>,
    latest: RwLock<Option<Estimate>>,
}

impl<E: StatsEngine> MetaAnalysisOrchestrator<E> {
    /// Orchestrator with default limits
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, AnalysisConfig::default())
    }

    /// Orchestrator with configured limits
    #[must_use]
    pub fn with_config(engine: E, config: AnalysisConfig) -> Self {
        Self {
            engine,
            init_timeout: config.init_timeout(),
            run_timeout: config.run_timeout(),
            status: watch::Sender::new(AnalysisStatus::Uninitialized),
            latest: RwLock::new(None),
        }
    }

    /// With explicit limits for boot and evaluation
    #[must_use]
    pub fn with_timeouts(mut self, init: Duration, run: Duration) -> Self {
        self.init_timeout = init;
        self.run_timeout = run;
        self
    }

    /// Current status
    #[inline]
    #[must_use]
    pub fn status(&self) -> AnalysisStatus {
        *self.status.borrow()
    }

    /// Watch status transitions
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AnalysisStatus> {
        self.status.subscribe()
    }

    /// Estimate of the last successful run
    #[must_use]
    pub fn latest_estimate(&self) -> Option<Estimate> {
        *self.latest.read()
    }

    /// The owned engine
    #[inline]
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Boot the engine
    ///
    /// A no-op once booted. A caller arriving while another boot is in
    /// progress waits for it and gets `Ok` if it succeeded, or
    /// `NotReady(Uninitialized)` if it failed. A failed boot returns the
    /// status to `Uninitialized` so it can be retried.
    ///
    /// # Errors
    /// - `AnalysisError::InitializationFailed` if the engine failed to boot
    /// - `AnalysisError::Timeout` if it did not boot in time
    /// - `AnalysisError::NotReady` if a concurrent boot failed
    pub async fn initialize(&self) -> Result<(), AnalysisError> {
        if self
            .claim(AnalysisStatus::Uninitialized, AnalysisStatus::Initializing)
            .is_err()
        {
            return self.await_boot().await;
        }

        let mut guard = StatusGuard::new(
            &self.status,
            AnalysisStatus::Initializing,
            AnalysisStatus::Uninitialized,
        );
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.init_timeout, self.engine.boot()).await;
        guard.disarm();

        match outcome {
            Ok(Ok(())) => {
                self.transition(AnalysisStatus::Initializing, AnalysisStatus::Ready)?;
                tracing::info!(elapsed = ?started.elapsed(), "engine initialized");
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "engine initialization failed");
                self.transition(AnalysisStatus::Initializing, AnalysisStatus::Uninitialized)?;
                Err(AnalysisError::InitializationFailed(e))
            }
            Err(_) => {
                tracing::warn!(after = ?self.init_timeout, "engine initialization timed out");
                self.transition(AnalysisStatus::Initializing, AnalysisStatus::Uninitialized)?;
                Err(AnalysisError::Timeout {
                    phase: "initialization",
                    after: self.init_timeout,
                })
            }
        }
    }

    /// Run one analysis
    ///
    /// An empty request is refused before any status change and never
    /// reaches the engine. The status returns to `Ready` whatever the
    /// outcome, including when the returned future is dropped.
    ///
    /// # Errors
    /// - `AnalysisError::EmptySelection` for an empty request
    /// - `AnalysisError::Busy` while another run is in flight
    /// - `AnalysisError::NotReady` before initialization
    /// - `AnalysisError::Engine`, `Decode` or `Timeout` for a failed run
    pub async fn run(&self, request: &AnalysisRequest) -> Result<Estimate, AnalysisError> {
        if request.is_empty() {
            return Err(AnalysisError::EmptySelection);
        }
        if let Err(observed) = self.claim(AnalysisStatus::Ready, AnalysisStatus::Running) {
            return Err(match observed {
                AnalysisStatus::Running | AnalysisStatus::Error => AnalysisError::Busy,
                other => AnalysisError::NotReady(other),
            });
        }

        let mut guard = StatusGuard::new(&self.status, AnalysisStatus::Running, AnalysisStatus::Ready);
        let started = Instant::now();
        let effect_count = request.len();
        let cluster_count = request.cluster_count();

        let outcome = match tokio::time::timeout(self.run_timeout, self.engine.evaluate(request)).await {
            Ok(Ok(values)) => decode(&values, effect_count, cluster_count).map_err(AnalysisError::from),
            Ok(Err(e)) => Err(AnalysisError::Engine(e)),
            Err(_) => Err(AnalysisError::Timeout {
                phase: "evaluation",
                after: self.run_timeout,
            }),
        };
        guard.disarm();

        match outcome {
            Ok(estimate) => {
                *self.latest.write() = Some(estimate);
                self.transition(AnalysisStatus::Running, AnalysisStatus::Ready)?;
                tracing::info!(
                    effects = effect_count,
                    clusters = cluster_count,
                    estimate = estimate.estimate,
                    elapsed = ?started.elapsed(),
                    "analysis complete"
                );
                Ok(estimate)
            }
            Err(e) => {
                tracing::warn!(error = %e, effects = effect_count, "analysis failed");
                self.transition(AnalysisStatus::Running, AnalysisStatus::Error)?;
                self.transition(AnalysisStatus::Error, AnalysisStatus::Ready)?;
                Err(e)
            }
        }
    }

    /// Atomically move `from -> to`, or report the status actually found
    fn claim(&self, from: AnalysisStatus, to: AnalysisStatus) -> Result<(), AnalysisStatus> {
        let mut observed = from;
        let claimed = self.status.send_if_modified(|s| {
            observed = *s;
            if *s == from {
                *s = to;
                true
            } else {
                false
            }
        });
        if claimed {
            tracing::debug!(%from, %to, "status transition");
            Ok(())
        } else {
            Err(observed)
        }
    }

    fn transition(&self, from: AnalysisStatus, to: AnalysisStatus) -> Result<(), AnalysisError> {
        validate_transition(from, to)?;
        self.claim(from, to)
            .map_err(|observed| AnalysisError::IllegalTransition { from: observed, to })
    }

    async fn await_boot(&self) -> Result<(), AnalysisError> {
        let mut rx = self.status.subscribe();
        let status = match rx.wait_for(|s| *s != AnalysisStatus::Initializing).await {
            Ok(status) => *status,
            Err(_) => self.status(),
        };
        if status.is_initialized() {
            Ok(())
        } else {
            Err(AnalysisError::NotReady(status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MockStatsEngine;
    use crate::error::EngineError;
    use crate::request::EffectRow;
    use metacat_graph::EffectId;

    fn request(n: u32) -> AnalysisRequest {
        AnalysisRequest {
            rows: (0..n)
                .map(|i| EffectRow {
                    effect_id: EffectId(i),
                    effect_size: 0.1 * f64::from(i),
                    variance: 0.02,
                    cluster: format!("{}/{}", i % 2, i),
                    subgroup: "behavior".to_string(),
                    intervention_condition: String::new(),
                    control_condition: String::new(),
                })
                .collect(),
        }
    }

    fn booting_engine() -> MockStatsEngine {
        let mut engine = MockStatsEngine::new();
        engine.expect_boot().times(1).returning(|| Ok(()));
        engine
    }

    #[tokio::test]
    async fn initialize_is_idempotent() {
        let orchestrator = MetaAnalysisOrchestrator::new(booting_engine());
        assert_eq!(orchestrator.status(), AnalysisStatus::Uninitialized);
        orchestrator.initialize().await.unwrap();
        orchestrator.initialize().await.unwrap();
        assert_eq!(orchestrator.status(), AnalysisStatus::Ready);
    }

    #[tokio::test]
    async fn failed_boot_can_be_retried() {
        let mut engine = MockStatsEngine::new();
        let mut seq = mockall::Sequence::new();
        engine
            .expect_boot()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(EngineError::Closed));
        engine
            .expect_boot()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(()));

        let orchestrator = MetaAnalysisOrchestrator::new(engine);
        let err = orchestrator.initialize().await.unwrap_err();
        assert!(matches!(err, AnalysisError::InitializationFailed(_)));
        assert_eq!(orchestrator.status(), AnalysisStatus::Uninitialized);

        orchestrator.initialize().await.unwrap();
        assert_eq!(orchestrator.status(), AnalysisStatus::Ready);
    }

    #[tokio::test]
    async fn empty_request_never_reaches_engine() {
        let mut engine = booting_engine();
        engine.expect_evaluate().times(0);
        let orchestrator = MetaAnalysisOrchestrator::new(engine);
        orchestrator.initialize().await.unwrap();

        let mut rx = orchestrator.subscribe();
        rx.borrow_and_update();
        let err = orchestrator.run(&AnalysisRequest::default()).await.unwrap_err();
        assert!(matches!(err, AnalysisError::EmptySelection));
        assert!(err.is_precondition());
        assert_eq!(orchestrator.status(), AnalysisStatus::Ready);
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn run_before_initialize_is_not_ready() {
        let mut engine = MockStatsEngine::new();
        engine.expect_evaluate().times(0);
        let orchestrator = MetaAnalysisOrchestrator::new(engine);
        let err = orchestrator.run(&request(3)).await.unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::NotReady(AnalysisStatus::Uninitialized)
        ));
    }

    #[tokio::test]
    async fn successful_run_returns_estimate() {
        let mut engine = booting_engine();
        engine
            .expect_evaluate()
            .withf(|r| r.len() == 4)
            .times(1)
            .returning(|_| Ok(vec![0.2, 0.05, 0.35, 0.4, 0.3, 1.33, 0.18]));
        let orchestrator = MetaAnalysisOrchestrator::new(engine);
        orchestrator.initialize().await.unwrap();

        let estimate = orchestrator.run(&request(4)).await.unwrap();
        assert!(estimate.ci_lower <= estimate.estimate && estimate.estimate <= estimate.ci_upper);
        assert_eq!(estimate.effect_count, 4);
        assert_eq!(estimate.cluster_count, 4);
        assert_eq!(orchestrator.latest_estimate(), Some(estimate));
        assert_eq!(orchestrator.status(), AnalysisStatus::Ready);
    }

    #[tokio::test]
    async fn engine_failure_returns_to_ready_and_keeps_latest() {
        let mut engine = booting_engine();
        let mut seq = mockall::Sequence::new();
        engine
            .expect_evaluate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![0.2, 0.05, 0.35, 0.4, 0.3, 1.33, 0.18]));
        engine
            .expect_evaluate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Err(EngineError::Failed("no convergence".to_string())));
        engine
            .expect_evaluate()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(vec![1.0, 2.0]));

        let orchestrator = MetaAnalysisOrchestrator::new(engine);
        orchestrator.initialize().await.unwrap();
        let first = orchestrator.run(&request(2)).await.unwrap();

        let mut rx = orchestrator.subscribe();
        let err = orchestrator.run(&request(2)).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Engine(EngineError::Failed(_))));
        assert!(rx.has_changed().unwrap());
        assert_eq!(*rx.borrow_and_update(), AnalysisStatus::Ready);

        let err = orchestrator.run(&request(2)).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
        assert_eq!(orchestrator.status(), AnalysisStatus::Ready);
        assert_eq!(orchestrator.latest_estimate(), Some(first));
    }
}
