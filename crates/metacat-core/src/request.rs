//! Engine request rows

use metacat_graph::{EffectId, EntityGraph};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Subgroup key for effects whose outcome carries no category
pub const UNSPECIFIED_SUBGROUP: &str = "unspecified";

/// One effect as the engine sees it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectRow {
    /// Effect identifier
    pub effect_id: EffectId,
    /// Standardized mean difference
    pub effect_size: f64,
    /// Sampling variance
    pub variance: f64,
    /// Dependence cluster, `"<paper>/<study>"`
    pub cluster: String,
    /// Outcome category tags, semicolon-joined
    pub subgroup: String,
    /// Intervention condition label
    pub intervention_condition: String,
    /// Control condition label
    pub control_condition: String,
}

/// Rows handed to the engine for one analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    /// Effect rows in identifier order
    pub rows: Vec<EffectRow>,
}

impl AnalysisRequest {
    /// Build rows for the selected effects
    ///
    /// Identifiers missing from the graph are skipped.
    #[must_use]
    pub fn from_effects(graph: &EntityGraph, effects: &BTreeSet<EffectId>) -> Self {
        let rows = effects
            .iter()
            .filter_map(|id| graph.effect(*id))
            .filter_map(|effect| {
                let variance = effect.sampling_variance()?;
                let subgroup = graph
                    .outcome(effect.outcome_id)
                    .map(|o| o.category.joined())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| UNSPECIFIED_SUBGROUP.to_string());
                Some(EffectRow {
                    effect_id: effect.id,
                    effect_size: effect.effect_size,
                    variance,
                    cluster: format!("{}/{}", effect.paper_id, effect.study_id),
                    subgroup,
                    intervention_condition: effect.intervention_condition.clone(),
                    control_condition: effect.control_condition.clone(),
                })
            })
            .collect();
        Self { rows }
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True if there are no rows
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of distinct clusters
    #[must_use]
    pub fn cluster_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.cluster.as_str())
            .collect::<HashSet<_>>()
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn graph() -> EntityGraph {
        EntityGraph::from_json_str(
            r#"{
            "papers": [{"id": 1, "year": 2020}],
            "studies": [{"id": 1, "paper_id": 1}, {"id": 2, "paper_id": 1}],
            "interventions": [{"id": 1}],
            "outcomes": [{"id": 1, "category": "behavior"}, {"id": 2}],
            "effects": [
                {"id": 1, "paper_id": 1, "study_id": 1, "intervention_id": 1, "outcome_id": 1,
                 "effect_size": 0.3, "std_error": 0.1,
                 "intervention_condition": "video", "control_condition": "no video"},
                {"id": 2, "paper_id": 1, "study_id": 2, "intervention_id": 1, "outcome_id": 2,
                 "effect_size": 0.1, "variance": 0.05},
                {"id": 3, "paper_id": 1, "study_id": 2, "intervention_id": 1, "outcome_id": 2,
                 "effect_size": 0.2, "variance": 0.05}
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn builds_rows() {
        let graph = graph();
        let request =
            AnalysisRequest::from_effects(&graph, &BTreeSet::from([EffectId(1), EffectId(2)]));
        assert_eq!(request.len(), 2);
        let first = &request.rows[0];
        assert_eq!(first.cluster, "1/1");
        assert_eq!(first.subgroup, "behavior");
        assert!((first.variance - 0.01).abs() < 1e-12);
        assert_eq!(first.intervention_condition, "video");
        assert_eq!(request.rows[1].subgroup, UNSPECIFIED_SUBGROUP);
    }

    #[test]
    fn counts_clusters() {
        let graph = graph();
        let all: BTreeSet<EffectId> = graph.effects().keys().copied().collect();
        let request = AnalysisRequest::from_effects(&graph, &all);
        assert_eq!(request.len(), 3);
        assert_eq!(request.cluster_count(), 2);
    }

    #[test]
    fn serializes_protocol_fields() {
        let graph = graph();
        let request = AnalysisRequest::from_effects(&graph, &BTreeSet::from([EffectId(2)]));
        let json = serde_json::to_value(&request.rows[0]).unwrap();
        assert_eq!(json["effect_id"], 2);
        assert_eq!(json["cluster"], "1/2");
    }
}
