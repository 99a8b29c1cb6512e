use std::cell::RefCell;

use regionmerge_test_support::tracing::RecordingLayer;
use rstest::rstest;
use tracing::Level;

use super::*;
use crate::{
    edge::{EdgeRecord, EdgeRef, EdgeStore, HistogramBins, MergeStrategy, WeightStrategy},
    error::MergeErrorCode,
    test_utils::weighted_graph,
};

/// Weight that reads the affinity back, so weights survive reweighting.
fn one_minus_affinity(edge: EdgeRef<'_>, _: u64, _: u64) -> f64 {
    1.0 - edge.affinity()
}

fn run_with(
    merging: &RegionMerging,
    graph: &mut UndirectedGraph,
) -> (MergeOutcome, HashMap<NodeId, u64>) {
    let mut sizes = graph.unit_region_sizes();
    let outcome = merging
        .run(
            graph,
            &MergeStrategy::MinAffinity,
            &one_minus_affinity,
            &mut sizes,
            |_, _, _, _| {},
        )
        .expect("run succeeds");
    (outcome, sizes)
}

fn merged_edges(outcome: &MergeOutcome) -> Vec<EdgeIndex> {
    outcome.log().iter().map(|record| record.edge).collect()
}

fn default_merging() -> RegionMerging {
    RegionMergingBuilder::new().build().expect("defaults are valid")
}

#[test]
fn builder_defaults() {
    let merging = default_merging();
    assert_eq!(merging.threshold(), 1.0);
    assert_eq!(merging.minimum_multiplicity(), 0);
    assert!(merging.non_contracting_edges().is_empty());
    assert!(merging.max_passes().is_none());
}

#[rstest]
#[case(f64::INFINITY)]
#[case(-0.5)]
fn non_nan_thresholds_are_accepted(#[case] threshold: f64) {
    let merging = RegionMergingBuilder::new()
        .with_threshold(threshold)
        .build()
        .expect("threshold is accepted");
    assert_eq!(merging.threshold(), threshold);
}

#[test]
fn empty_graph_converges_immediately() {
    let mut graph = UndirectedGraph::default();
    let (outcome, sizes) = run_with(&default_merging(), &mut graph);
    assert!(outcome.log().is_empty());
    assert_eq!(outcome.passes(), 1);
    assert!(outcome.converged());
    assert!(sizes.is_empty());
}

#[test]
fn clean_minimum_contracts_first() {
    let mut graph = weighted_graph(&[(0, 1, 0.1), (1, 2, 0.2), (2, 3, 0.3)]);
    let merging = RegionMergingBuilder::new()
        .with_threshold(0.15)
        .build()
        .expect("valid");

    let (outcome, sizes) = run_with(&merging, &mut graph);

    assert_eq!(merged_edges(&outcome), vec![0]);
    let record = outcome.log()[0];
    assert_eq!((record.region1, record.region2), (0, 1));
    assert_eq!(record.weight_bits(), record.weight.to_bits());
    assert!((record.weight - 0.1).abs() < 1e-12);
    assert_eq!(sizes.get(&0), Some(&2));
    assert_eq!(sizes.get(&1), None);
    assert_eq!(graph.edges().get(0).map(|edge| edge.weight()), Some(f64::INFINITY));
}

#[test]
fn chain_contracts_one_edge_per_pass() {
    let mut graph = weighted_graph(&[(0, 1, 0.1), (1, 2, 0.2), (2, 3, 0.3)]);
    let (outcome, sizes) = run_with(&default_merging(), &mut graph);

    assert_eq!(merged_edges(&outcome), vec![0, 1, 2]);
    assert_eq!(outcome.passes(), 4);
    assert!(outcome.converged());
    assert_eq!(sizes.values().copied().collect::<Vec<_>>(), vec![4]);
    assert_eq!(outcome.regions().set_count(), 1);
    assert_eq!(graph.live_edge_count(), 0);
}

#[test]
fn unanimous_plateau_contracts_together() {
    let mut graph = weighted_graph(&[(0, 1, 0.2), (1, 2, 0.2)]);
    let (outcome, _) = run_with(&default_merging(), &mut graph);

    assert_eq!(merged_edges(&outcome), vec![0, 1]);
    assert_eq!(outcome.passes(), 2);
}

#[test]
fn plateau_waits_for_a_lighter_neighbour() {
    let mut graph = weighted_graph(&[(0, 1, 0.2), (1, 2, 0.2), (2, 3, 0.1)]);
    let (outcome, _) = run_with(&default_merging(), &mut graph);

    assert_eq!(merged_edges(&outcome), vec![2, 0, 1]);
}

#[test]
fn plateau_above_threshold_never_contracts() {
    let mut graph = weighted_graph(&[(0, 1, 0.6), (1, 2, 0.6)]);
    let merging = RegionMergingBuilder::new()
        .with_threshold(0.5)
        .build()
        .expect("valid");
    let (outcome, _) = run_with(&merging, &mut graph);
    assert!(outcome.log().is_empty());
}

#[rstest]
#[case::protected_neighbour(vec![1], vec![])]
#[case::protected_self(vec![0], vec![])]
#[case::unprotected(vec![], vec![0, 1])]
fn non_contracting_edges_hold_back_their_neighbourhood(
    #[case] protected: Vec<EdgeIndex>,
    #[case] expected: Vec<EdgeIndex>,
) {
    let mut graph = weighted_graph(&[(0, 1, 0.1), (1, 2, 0.5)]);
    let merging = RegionMergingBuilder::new()
        .with_non_contracting_edges(protected)
        .build()
        .expect("valid");
    let (outcome, _) = run_with(&merging, &mut graph);
    assert_eq!(merged_edges(&outcome), expected);
}

#[rstest]
#[case::protected_neighbour(vec![2], vec![])]
#[case::protected_member(vec![0], vec![])]
#[case::unprotected(vec![], vec![0, 1, 2])]
fn non_contracting_edges_hold_back_whole_plateaus(
    #[case] protected: Vec<EdgeIndex>,
    #[case] expected: Vec<EdgeIndex>,
) {
    let mut graph = weighted_graph(&[(0, 1, 0.2), (1, 2, 0.2), (2, 3, 0.5)]);
    let merging = RegionMergingBuilder::new()
        .with_non_contracting_edges(protected)
        .build()
        .expect("valid");
    let (outcome, _) = run_with(&merging, &mut graph);
    assert_eq!(merged_edges(&outcome), expected);
}

#[rstest]
#[case::below_gate(1, vec![])]
#[case::at_gate(2, vec![0])]
#[case::above_gate(3, vec![0])]
fn multiplicity_gate_is_inclusive(#[case] multiplicity: u64, #[case] expected: Vec<EdgeIndex>) {
    let mut store = EdgeStore::new(0);
    store
        .append(EdgeRecord::new(0.9, 0, 1, multiplicity), &[])
        .expect("append");
    let mut graph =
        UndirectedGraph::from_store(store, &MergeStrategy::MinAffinity).expect("graph");
    let merging = RegionMergingBuilder::new()
        .with_minimum_multiplicity(2)
        .build()
        .expect("valid");

    let (outcome, _) = run_with(&merging, &mut graph);

    assert_eq!(merged_edges(&outcome), expected);
}

#[test]
fn low_multiplicity_edges_are_invisible() {
    let mut store = EdgeStore::new(0);
    store
        .append(EdgeRecord::new(0.9, 0, 1, 1), &[])
        .expect("append");
    store
        .append(EdgeRecord::new(0.7, 1, 2, 5), &[])
        .expect("append");
    let mut graph =
        UndirectedGraph::from_store(store, &MergeStrategy::MinAffinity).expect("graph");
    let merging = RegionMergingBuilder::new()
        .with_minimum_multiplicity(2)
        .build()
        .expect("valid");

    let (outcome, _) = run_with(&merging, &mut graph);

    assert_eq!(merged_edges(&outcome), vec![1]);
    assert!(graph.edges().get(0).expect("edge 0").is_valid());
}

#[test]
fn region_sizes_feed_the_weight() {
    let mut graph = weighted_graph(&[(0, 1, 0.1), (1, 2, 0.5)]);
    let seen = RefCell::new(Vec::new());
    let weight = |edge: EdgeRef<'_>, size1: u64, size2: u64| {
        seen.borrow_mut().push((edge.index(), size1, size2));
        1.0 - edge.affinity()
    };
    let mut sizes = graph.unit_region_sizes();

    default_merging()
        .run(&mut graph, &MergeStrategy::MinAffinity, &weight, &mut sizes, |_, _, _, _| {})
        .expect("run succeeds");

    let seen = seen.into_inner();
    assert!(seen.contains(&(0, 1, 1)));
    assert!(seen.contains(&(1, 1, 1)));
    assert!(seen.contains(&(1, 1, 2)), "edge 1 is reweighted against the merged region");
}

#[test]
fn on_merge_reports_every_contraction_in_order() {
    let mut graph = weighted_graph(&[(0, 1, 0.1), (1, 2, 0.2), (2, 3, 0.3)]);
    let mut sizes = graph.unit_region_sizes();
    let mut merges = Vec::new();

    let outcome = default_merging()
        .run(
            &mut graph,
            &MergeStrategy::MinAffinity,
            &one_minus_affinity,
            &mut sizes,
            |region1, region2, merged, weight| merges.push((region1, region2, merged, weight)),
        )
        .expect("run succeeds");

    assert_eq!(merges.len(), outcome.log().len());
    for ((region1, region2, merged, weight), record) in merges.iter().zip(outcome.log()) {
        assert_eq!((*region1, *region2), (record.region1, record.region2));
        assert!(*merged == *region1 || *merged == *region2);
        assert_eq!(weight.to_bits(), record.weight_bits());
    }
}

#[test]
fn pass_cap_stops_early_with_a_warning() {
    let mut graph = weighted_graph(&[(0, 1, 0.1), (1, 2, 0.2), (2, 3, 0.3)]);
    let merging = RegionMergingBuilder::new()
        .with_max_passes(NonZeroUsize::new(2).expect("non-zero"))
        .build()
        .expect("valid");

    let ((outcome, _), layer) = RecordingLayer::capture(|| run_with(&merging, &mut graph));

    assert_eq!(outcome.passes(), 2);
    assert!(!outcome.converged());
    assert_eq!(merged_edges(&outcome), vec![0, 1]);
    let warnings = layer.events_with_message("pass cap reached before fixpoint");
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].level, Level::WARN);
    assert_eq!(warnings[0].field("merges"), Some("2"));
}

#[test]
fn run_is_instrumented() {
    let mut graph = weighted_graph(&[(0, 1, 0.1), (1, 2, 0.2)]);
    let ((outcome, _), layer) = RecordingLayer::capture(|| run_with(&default_merging(), &mut graph));

    let spans = layer.spans_named("core.merge_run");
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].fields.get("edges").map(String::as_str), Some("2"));
    let passes = layer.events_with_message("finished merging pass");
    assert_eq!(passes.len(), outcome.passes());
    assert!(passes.iter().all(|event| event.level == Level::DEBUG));
    assert_eq!(layer.events_with_message("contracting edge").len(), 2);
}

#[test]
fn weight_payload_must_match_the_store() {
    let bins = HistogramBins::new(NonZeroUsize::new(4).expect("non-zero"), 0.0, 1.0)
        .expect("valid bins");
    let mut graph = weighted_graph(&[(0, 1, 0.1)]);
    let mut sizes = graph.unit_region_sizes();

    let err = default_merging()
        .run(
            &mut graph,
            &MergeStrategy::MinAffinity,
            &WeightStrategy::MedianHistogram(bins),
            &mut sizes,
            |_, _, _, _| {},
        )
        .expect_err("weight reads a histogram the store lacks");

    assert_eq!(err, MergeError::PayloadLengthMismatch { weight: 5, store: 0 });
}

#[test]
fn merger_payload_must_match_the_store() {
    let mut graph = weighted_graph(&[(0, 1, 0.1)]);
    let mut sizes = graph.unit_region_sizes();

    let err = default_merging()
        .run(
            &mut graph,
            &MergeStrategy::MedianHistogram(NonZeroUsize::new(3).expect("non-zero")),
            &one_minus_affinity,
            &mut sizes,
            |_, _, _, _| {},
        )
        .expect_err("merger expects a histogram");

    assert_eq!(err.code(), MergeErrorCode::GraphFailure);
    assert_eq!(
        err.graph_code(),
        Some(crate::error::GraphErrorCode::PayloadLengthMismatch)
    );
}
