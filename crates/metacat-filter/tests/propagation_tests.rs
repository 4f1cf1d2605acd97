use metacat_filter::{
    propagate, FilterEngine, FilterSpec, Lock, LockMap, Predicate, PredicateGroup, Subsets,
};
use metacat_graph::{
    Category, Dataset, Effect, EffectId, EntityGraph, Field, Intervention, InterventionId,
    Outcome, OutcomeId, Paper, PaperId, Study, StudyId, TagSet,
};
use proptest::prelude::*;
use std::collections::BTreeSet;

const MEDIA: [&str; 3] = ["video", "text", "in-person"];

#[derive(Debug, Clone)]
struct EffectSeed {
    study: usize,
    intervention: usize,
    outcome: usize,
    size: f64,
    control: Option<u32>,
    treated: Option<u32>,
}

fn effect_seed() -> impl Strategy<Value = EffectSeed> {
    (
        0..8usize,
        0..4usize,
        0..3usize,
        -1.0..1.5f64,
        proptest::option::of(0..200u32),
        proptest::option::of(0..200u32),
    )
        .prop_map(|(study, intervention, outcome, size, control, treated)| EffectSeed {
            study,
            intervention,
            outcome,
            size,
            control,
            treated,
        })
}

fn build_graph(years: &[i32], media: &[usize], seeds: &[EffectSeed]) -> EntityGraph {
    let papers: Vec<Paper> = years
        .iter()
        .enumerate()
        .map(|(i, year)| Paper {
            id: PaperId(i as u32),
            year: *year,
            title: format!("paper {i}"),
            authors: String::new(),
            source: if i % 2 == 0 { "journal" } else { "report" }.to_string(),
            open_access: i % 3 == 0,
            data_available: false,
        })
        .collect();
    let studies: Vec<Study> = (0..papers.len() * 2)
        .map(|i| Study {
            id: StudyId(i as u32),
            paper_id: PaperId((i / 2) as u32),
            sample_size: Some(40 + i as u32 * 10),
            randomization: TagSet::single("individual"),
            condition_assignment: TagSet::new(),
            preregistered: i % 2 == 1,
        })
        .collect();
    let interventions: Vec<Intervention> = media
        .iter()
        .enumerate()
        .map(|(i, m)| Intervention {
            id: InterventionId(i as u32),
            content: TagSet::new(),
            mechanism: TagSet::new(),
            medium: TagSet::single(MEDIA[*m]),
        })
        .collect();
    let outcomes: Vec<Outcome> = ["behavior", "intention", "attitude"]
        .iter()
        .enumerate()
        .map(|(i, c)| Outcome {
            id: OutcomeId(i as u32),
            category: TagSet::single(*c),
            subcategory: TagSet::new(),
            measurement: TagSet::new(),
        })
        .collect();
    let effects: Vec<Effect> = seeds
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let study = &studies[s.study % studies.len()];
            Effect {
                id: EffectId(i as u32),
                paper_id: study.paper_id,
                study_id: study.id,
                intervention_id: InterventionId((s.intervention % interventions.len()) as u32),
                outcome_id: OutcomeId(s.outcome as u32),
                effect_size: s.size,
                variance: Some(0.02),
                std_error: None,
                p_value: None,
                n_control: s.control,
                n_intervention: s.treated,
                intervention_condition: "treatment".to_string(),
                control_condition: "control".to_string(),
            }
        })
        .collect();

    EntityGraph::from_dataset(Dataset {
        papers,
        studies,
        samples: Vec::new(),
        interventions,
        outcomes,
        effects,
    })
    .unwrap()
}

fn graph_strategy() -> impl Strategy<Value = EntityGraph> {
    (
        proptest::collection::vec(2000..2025i32, 1..5),
        proptest::collection::vec(0..MEDIA.len(), 1..4),
        proptest::collection::vec(effect_seed(), 0..30),
    )
        .prop_map(|(years, media, seeds)| build_graph(&years, &media, &seeds))
}

fn narrowed_spec(graph: &EntityGraph, from_year: i32, min_arm: u32) -> FilterSpec {
    let papers = PredicateGroup::identity(graph, Category::Paper)
        .with(Predicate::range(Field::Year, f64::from(from_year), 2100.0))
        .unwrap();
    let effects = PredicateGroup::identity(graph, Category::Effect)
        .with(Predicate::threshold(Field::ArmSizes, min_arm))
        .unwrap();
    FilterSpec::identity(graph)
        .with_group(papers)
        .with_group(effects)
}

fn assert_consistent(graph: &EntityGraph, shown: &Subsets) -> Result<(), TestCaseError> {
    for id in &shown.studies {
        let study = graph.study(*id).unwrap();
        prop_assert!(shown.papers.contains(&study.paper_id), "study {} without its paper", id.0);
    }
    for id in &shown.effects {
        let e = graph.effect(*id).unwrap();
        prop_assert!(shown.papers.contains(&e.paper_id));
        prop_assert!(shown.studies.contains(&e.study_id));
        prop_assert!(shown.interventions.contains(&e.intervention_id));
        prop_assert!(shown.outcomes.contains(&e.outcome_id));
    }
    Ok(())
}

fn direct_intersection(graph: &EntityGraph, fresh: &Subsets) -> BTreeSet<EffectId> {
    graph
        .effects()
        .values()
        .filter(|e| {
            fresh.effects.contains(&e.id)
                && fresh.papers.contains(&e.paper_id)
                && fresh.studies.contains(&e.study_id)
                && fresh.interventions.contains(&e.intervention_id)
                && fresh.outcomes.contains(&e.outcome_id)
        })
        .map(|e| e.id)
        .collect()
}

proptest! {
    #[test]
    fn prop_identity_spec_is_noop(graph in graph_strategy()) {
        let fresh = FilterEngine::new(&graph).apply(&FilterSpec::identity(&graph));
        prop_assert_eq!(&fresh, &Subsets::full(&graph));
        let shown = propagate(&graph, &fresh, &Subsets::default(), &LockMap::new());
        prop_assert_eq!(shown, fresh);
    }

    #[test]
    fn prop_open_locks_equal_direct_intersection(
        graph in graph_strategy(),
        from_year in 2000..2026i32,
        min_arm in 1..150u32,
    ) {
        let fresh = FilterEngine::new(&graph).apply(&narrowed_spec(&graph, from_year, min_arm));
        let previous = Subsets::default();
        let shown = propagate(&graph, &fresh, &previous, &LockMap::new());
        prop_assert_eq!(shown.effects, direct_intersection(&graph, &fresh));
    }

    #[test]
    fn prop_paper_filter_only_narrows_effects(
        graph in graph_strategy(),
        a in 2000..2026i32,
        b in 2000..2026i32,
    ) {
        let (loose, strict) = (a.min(b), a.max(b));
        let engine = FilterEngine::new(&graph);
        let full = Subsets::full(&graph);
        let locks = LockMap::new();

        let wide = propagate(&graph, &engine.apply(&narrowed_spec(&graph, loose, 1)), &full, &locks);
        let narrow = propagate(&graph, &engine.apply(&narrowed_spec(&graph, strict, 1)), &full, &locks);
        prop_assert!(narrow.effects.is_subset(&wide.effects));
        prop_assert!(wide.effects.is_subset(&full.effects));
        prop_assert!(narrow.papers.is_subset(&wide.papers));
        prop_assert!(narrow.studies.is_subset(&wide.studies));
        assert_consistent(&graph, &wide)?;
        assert_consistent(&graph, &narrow)?;
    }

    #[test]
    fn prop_open_display_hides_unreferenced_parents(
        graph in graph_strategy(),
        from_year in 2000..2026i32,
        min_arm in 1..150u32,
    ) {
        let fresh = FilterEngine::new(&graph).apply(&narrowed_spec(&graph, from_year, min_arm));
        let shown = propagate(&graph, &fresh, &Subsets::full(&graph), &LockMap::new());
        assert_consistent(&graph, &shown)?;

        let referenced: BTreeSet<StudyId> = graph.effects().values().map(|e| e.study_id).collect();
        for id in shown.studies.iter().filter(|id| referenced.contains(id)) {
            prop_assert!(shown.effects.iter().any(|e| graph.effect(*e).unwrap().study_id == *id));
        }
    }

    #[test]
    fn prop_held_category_survives_other_filters(
        graph in graph_strategy(),
        held in 0..5usize,
        from_year in 2000..2026i32,
        min_arm in 1..150u32,
    ) {
        let category = Category::ALL[held];
        let engine = FilterEngine::new(&graph);
        let full = Subsets::full(&graph);

        let first = propagate(&graph, &engine.apply(&narrowed_spec(&graph, 2010, 20)), &full, &LockMap::new());
        let locks = LockMap::new().with(category, Lock::Held);
        let second = propagate(&graph, &engine.apply(&narrowed_spec(&graph, from_year, min_arm)), &first, &locks);

        match category {
            Category::Paper => prop_assert_eq!(&second.papers, &first.papers),
            Category::Study => prop_assert_eq!(&second.studies, &first.studies),
            Category::Intervention => prop_assert_eq!(&second.interventions, &first.interventions),
            Category::Outcome => prop_assert_eq!(&second.outcomes, &first.outcomes),
            Category::Effect => prop_assert_eq!(&second.effects, &first.effects),
        }
    }
}

#[test]
fn test_holding_outcomes_while_narrowing_arms() {
    let seeds = vec![
        EffectSeed { study: 0, intervention: 0, outcome: 0, size: 0.2, control: Some(60), treated: Some(70) },
        EffectSeed { study: 1, intervention: 0, outcome: 1, size: 0.4, control: Some(30), treated: Some(90) },
        EffectSeed { study: 2, intervention: 1, outcome: 0, size: 0.1, control: Some(120), treated: Some(110) },
    ];
    let graph = build_graph(&[2015, 2020], &[0, 1], &seeds);
    let engine = FilterEngine::new(&graph);
    let full = Subsets::full(&graph);

    let behavior_only = FilterSpec::identity(&graph).with_group(
        PredicateGroup::new(Category::Outcome)
            .with(Predicate::any_of(Field::OutcomeCategory, ["behavior"]))
            .unwrap(),
    );
    let first = propagate(&graph, &engine.apply(&behavior_only), &full, &LockMap::new());
    assert_eq!(first.effects, BTreeSet::from([EffectId(0), EffectId(2)]));

    // Outcome group back to identity, but the outcome lock keeps "behavior".
    let locks = LockMap::new().with(Category::Outcome, Lock::Held);
    let second = propagate(&graph, &engine.apply(&narrowed_spec(&graph, 2000, 100)), &first, &locks);
    assert_eq!(second.outcomes, first.outcomes);
    assert_eq!(second.effects, BTreeSet::from([EffectId(2)]));
}

#[test]
fn test_paper_filter_drops_studies_of_excluded_papers() {
    let seeds = vec![
        EffectSeed { study: 0, intervention: 0, outcome: 0, size: 0.2, control: Some(60), treated: Some(70) },
        EffectSeed { study: 2, intervention: 1, outcome: 1, size: 0.4, control: Some(30), treated: Some(90) },
    ];
    let graph = build_graph(&[2012, 2021], &[0, 1], &seeds);
    let fresh = FilterEngine::new(&graph).apply(&narrowed_spec(&graph, 2020, 1));
    let shown = propagate(&graph, &fresh, &Subsets::full(&graph), &LockMap::new());

    assert_eq!(shown.papers, BTreeSet::from([PaperId(1)]));
    // Study 3 has no effects at all, so it stays with its paper.
    assert_eq!(shown.studies, BTreeSet::from([StudyId(2), StudyId(3)]));
    assert_eq!(shown.interventions, BTreeSet::from([InterventionId(1)]));
    assert_eq!(shown.outcomes, BTreeSet::from([OutcomeId(1), OutcomeId(2)]));
    assert_eq!(shown.effects, BTreeSet::from([EffectId(1)]));
}
