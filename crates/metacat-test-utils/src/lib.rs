//! Testing utilities for the Metacat workspace
//!
//! Shared fixtures and a scripted statistics engine.

#![allow(missing_docs)]

use async_trait::async_trait;
use metacat_core::{AnalysisRequest, EngineError, StatsEngine};
use metacat_graph::{Dataset, EntityGraph};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

/// Small but varied evidence base: five papers, six studies, twelve effects
pub const SAMPLE_DATASET: &str = r#"{
  "papers": [
    {"id": 1, "year": 2012, "title": "Leafleting and meat purchases", "authors": "Hart, B.", "source": "journal", "open_access": true, "data_available": false},
    {"id": 2, "year": 2016, "title": "Documentary screenings, two experiments", "authors": "Ng, L.; Ortiz, P.", "source": "journal", "open_access": false, "data_available": true},
    {"id": 3, "year": 2019, "title": "Menu defaults in university dining", "authors": "Kowalski, R.", "source": "report", "open_access": true, "data_available": true},
    {"id": 4, "year": 2021, "title": "Social norms messaging", "authors": "Adeyemi, T.", "source": "thesis", "open_access": true, "data_available": false},
    {"id": 5, "year": 2023, "title": "Health framing online", "authors": "Sato, K.", "source": "journal", "open_access": false, "data_available": true}
  ],
  "studies": [
    {"id": 1, "paper_id": 1, "sample_size": 180, "randomization": "individual", "condition_assignment": "between", "preregistered": false},
    {"id": 2, "paper_id": 2, "sample_size": 240, "randomization": "cluster", "condition_assignment": "between", "preregistered": true},
    {"id": 3, "paper_id": 2, "sample_size": 96, "randomization": "individual", "condition_assignment": "within", "preregistered": true},
    {"id": 4, "paper_id": 3, "sample_size": 1200, "randomization": "cluster", "condition_assignment": "between", "preregistered": false},
    {"id": 5, "paper_id": 4, "sample_size": 60, "randomization": "individual", "condition_assignment": "between", "preregistered": true},
    {"id": 6, "paper_id": 5, "sample_size": 410, "randomization": "individual", "condition_assignment": "between", "preregistered": true}
  ],
  "samples": [
    {"id": 1, "study_id": 1, "label": "shoppers, US", "size": 180},
    {"id": 2, "study_id": 4, "label": "students, PL", "size": 1200}
  ],
  "interventions": [
    {"id": 1, "content": "animal welfare", "mechanism": "emotional", "medium": "text"},
    {"id": 2, "content": "animal welfare", "mechanism": "emotional", "medium": "video"},
    {"id": 3, "content": "environment; health", "mechanism": "choice architecture", "medium": "in-person"},
    {"id": 4, "content": "environment", "mechanism": "norms", "medium": "text; video"},
    {"id": 5, "content": "health", "mechanism": "factual", "medium": "video"}
  ],
  "outcomes": [
    {"id": 1, "category": "behavior", "subcategory": "purchase", "measurement": "sales data"},
    {"id": 2, "category": "behavior", "subcategory": "consumption", "measurement": "food diary"},
    {"id": 3, "category": "intention", "subcategory": "", "measurement": "survey"},
    {"id": 4, "category": "attitude", "subcategory": "", "measurement": "survey"},
    {"id": 5, "category": "behavior", "subcategory": "meal choice", "measurement": "meal choice"}
  ],
  "effects": [
    {"id": 1, "paper_id": 1, "study_id": 1, "intervention_id": 1, "outcome_id": 1, "effect_size": 0.05, "std_error": 0.15, "p_value": 0.74, "n_control": 90, "n_intervention": 90, "intervention_condition": "leaflet", "control_condition": "no leaflet"},
    {"id": 2, "paper_id": 2, "study_id": 2, "intervention_id": 2, "outcome_id": 2, "effect_size": 0.22, "std_error": 0.13, "p_value": 0.09, "n_control": 120, "n_intervention": 120, "intervention_condition": "documentary", "control_condition": "nature film"},
    {"id": 3, "paper_id": 2, "study_id": 2, "intervention_id": 2, "outcome_id": 3, "effect_size": 0.41, "std_error": 0.13, "p_value": 0.002, "n_control": 120, "n_intervention": 120, "intervention_condition": "documentary", "control_condition": "nature film"},
    {"id": 4, "paper_id": 2, "study_id": 3, "intervention_id": 2, "outcome_id": 4, "effect_size": 0.55, "std_error": 0.21, "p_value": 0.009, "n_control": 48, "n_intervention": 48, "intervention_condition": "documentary", "control_condition": "no film"},
    {"id": 5, "paper_id": 3, "study_id": 4, "intervention_id": 3, "outcome_id": 5, "effect_size": 0.31, "variance": 0.0034, "n_control": 600, "n_intervention": 600, "intervention_condition": "vegetarian default", "control_condition": "meat default"},
    {"id": 6, "paper_id": 3, "study_id": 4, "intervention_id": 3, "outcome_id": 1, "effect_size": 0.18, "variance": 0.0036, "n_control": 600, "n_intervention": 600, "intervention_condition": "vegetarian default", "control_condition": "meat default"},
    {"id": 7, "paper_id": 4, "study_id": 5, "intervention_id": 4, "outcome_id": 3, "effect_size": 0.62, "std_error": 0.26, "p_value": 0.02, "n_control": 30, "n_intervention": 30, "intervention_condition": "norms message", "control_condition": "neutral message"},
    {"id": 8, "paper_id": 4, "study_id": 5, "intervention_id": 4, "outcome_id": 2, "effect_size": 0.12, "std_error": 0.26, "n_control": 30, "n_intervention": 30, "intervention_condition": "norms message", "control_condition": "neutral message"},
    {"id": 9, "paper_id": 5, "study_id": 6, "intervention_id": 5, "outcome_id": 2, "effect_size": 0.08, "std_error": 0.1, "p_value": 0.42, "n_control": 205, "n_intervention": 205, "intervention_condition": "health video", "control_condition": "placebo video"},
    {"id": 10, "paper_id": 5, "study_id": 6, "intervention_id": 5, "outcome_id": 3, "effect_size": 0.19, "std_error": 0.1, "p_value": 0.06, "n_control": 205, "n_intervention": 205, "intervention_condition": "health video", "control_condition": "placebo video"},
    {"id": 11, "paper_id": 5, "study_id": 6, "intervention_id": 5, "outcome_id": 4, "effect_size": 0.27, "std_error": 0.1, "p_value": 0.007, "n_control": 205, "n_intervention": 205, "intervention_condition": "health video", "control_condition": "placebo video"},
    {"id": 12, "paper_id": 1, "study_id": 1, "intervention_id": 1, "outcome_id": 4, "effect_size": -0.04, "std_error": 0.15, "n_control": 90, "n_intervention": 40, "intervention_condition": "leaflet", "control_condition": "no leaflet"}
  ]
}"#;

/// Parsed sample dataset
pub fn sample_dataset() -> Dataset {
    Dataset::from_json_str(SAMPLE_DATASET).unwrap()
}

/// Validated graph over the sample dataset
pub fn sample_graph() -> Arc<EntityGraph> {
    Arc::new(EntityGraph::from_json_str(SAMPLE_DATASET).unwrap())
}

/// Write the sample dataset into `dir`, returning the file path
pub fn write_sample_dataset(dir: &Path) -> PathBuf {
    let path = dir.join("effects.json");
    std::fs::write(&path, SAMPLE_DATASET).unwrap();
    path
}

/// Inverse-variance pooled mean with a normal 95% interval, as a 7-value
/// result vector with the Egger fields left unestimated
pub fn pooled_result(request: &AnalysisRequest) -> Vec<f64> {
    let (weight, weighted) = request
        .rows
        .iter()
        .filter(|r| r.variance > 0.0)
        .fold((0.0, 0.0), |(w, s), r| (w + 1.0 / r.variance, s + r.effect_size / r.variance));
    let mean = weighted / weight;
    let half = 1.96 * (1.0 / weight).sqrt();
    vec![mean, mean - half, mean + half, f64::NAN, f64::NAN, f64::NAN, f64::NAN]
}

/// Statistics engine driven by a script
///
/// Replies come from a queue of canned responses, falling back to
/// [`pooled_result`]. Evaluations can be held open with [`gated`](Self::gated)
/// until [`release`](Self::release) is called.
#[derive(Debug, Default)]
pub struct ScriptedEngine {
    responses: Mutex<VecDeque<Result<Vec<f64>, EngineError>>>,
    boot_failures: AtomicUsize,
    gate: Option<Notify>,
    entered: Notify,
    boots: AtomicUsize,
    evaluations: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    requests: Mutex<Vec<AnalysisRequest>>,
}

impl ScriptedEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hold every evaluation until released
    pub fn gated(mut self) -> Self {
        self.gate = Some(Notify::new());
        self
    }

    /// Fail the first `n` boots
    pub fn failing_boots(self, n: usize) -> Self {
        self.boot_failures.store(n, Ordering::SeqCst);
        self
    }

    /// Queue a canned response
    pub fn respond(self, response: Result<Vec<f64>, EngineError>) -> Self {
        self.responses.lock().push_back(response);
        self
    }

    /// Let one held evaluation finish
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }

    /// Wait until an evaluation has started
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn boots(&self) -> usize {
        self.boots.load(Ordering::SeqCst)
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations.load(Ordering::SeqCst)
    }

    /// Evaluations currently in flight
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of evaluations ever in flight at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Requests received, in order
    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.requests.lock().clone()
    }
}

/// Decrements the in-flight count when an evaluation ends or is dropped
struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl StatsEngine for ScriptedEngine {
    async fn boot(&self) -> Result<(), EngineError> {
        self.boots.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let failing = self
            .boot_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            Err(EngineError::Failed("scripted boot failure".to_string()))
        } else {
            Ok(())
        }
    }

    async fn evaluate(&self, request: &AnalysisRequest) -> Result<Vec<f64>, EngineError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let canned = self.responses.lock().pop_front();
        canned.unwrap_or_else(|| Ok(pooled_result(request)))
    }
}
