//! End-to-end merging scenarios on small hand-built graphs.

mod common;

use common::{BRIDGE_EDGE, SECOND_EDGE, merge_with_threshold, nine_node_graph};
use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;
use regionmerge_core::{
    CreatorStrategy, MergeStrategy, RawEdge, RegionMergingBuilder, UndirectedGraph,
    WeightStrategy,
};
use regionmerge_test_support::property_test_profile::ProptestRunProfile;
use regionmerge_test_support::tracing::RecordingLayer;
use rstest::rstest;
use tracing::Level;

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

#[rstest]
fn single_merge_at_the_strongest_edge() {
    let mut graph = nine_node_graph(0.9, 0.1);
    let mut sizes = graph.unit_region_sizes();

    let outcome = merge_with_threshold(&mut graph, &mut sizes, 0.5);

    assert_eq!(outcome.log().len(), 1);
    let record = outcome.log()[0];
    assert_eq!(record.edge, BRIDGE_EDGE);
    assert!(close(record.weight, 0.1));
    assert_eq!(f64::from_bits(record.weight_bits()), record.weight);

    for edge in graph.edges().iter() {
        if edge.index() == BRIDGE_EDGE {
            assert!(edge.is_obsolete());
        } else {
            assert!(edge.is_valid(), "edge {} stays live", edge.index());
            assert!(close(edge.weight(), 0.9), "edge {} keeps its weight", edge.index());
        }
    }
    assert_eq!(graph.node_count(), 8);
    assert_eq!(sizes.values().sum::<u64>(), 9);
}

#[rstest]
fn consecutive_merges_follow_the_weight_order() {
    let mut graph = nine_node_graph(0.9, 0.5);
    let mut sizes = graph.unit_region_sizes();

    let outcome = merge_with_threshold(&mut graph, &mut sizes, 0.8);

    let edges: Vec<_> = outcome.log().iter().map(|record| record.edge).collect();
    assert_eq!(edges, vec![BRIDGE_EDGE, SECOND_EDGE]);
    assert!(close(outcome.log()[1].weight, 0.5));
    assert_eq!(outcome.passes(), 3);
    assert_eq!(sizes.values().copied().max(), Some(3));
}

#[rstest]
fn merge_all_retires_every_edge() {
    let mut graph = nine_node_graph(0.9, 0.1);
    let mut sizes = graph.unit_region_sizes();

    let outcome = merge_with_threshold(&mut graph, &mut sizes, 1.0);

    assert_eq!(outcome.log().len(), 8);
    assert!(graph.edges().iter().all(|edge| edge.is_obsolete()));
    assert_eq!(graph.live_edge_count(), 0);
    assert_eq!(graph.node_count(), 1);
    assert_eq!(sizes.len(), 1);
    assert_eq!(sizes.values().copied().next(), Some(9));

    let mut regions = outcome.regions().clone();
    let root = regions.find_root(0);
    assert!((1..9).all(|node| regions.find_root(node) == root));
}

#[rstest]
#[case::single(0.9, 0.1, 0.5)]
#[case::consecutive(0.9, 0.5, 0.8)]
#[case::merge_all(0.9, 0.1, 1.0)]
fn rerunning_a_fixpoint_merges_nothing(
    #[case] bridge: f64,
    #[case] second: f64,
    #[case] threshold: f64,
) {
    let mut graph = nine_node_graph(bridge, second);
    let mut sizes = graph.unit_region_sizes();
    merge_with_threshold(&mut graph, &mut sizes, threshold);
    let settled = graph.edges().clone();

    let again = merge_with_threshold(&mut graph, &mut sizes, threshold);

    assert!(again.log().is_empty());
    assert_eq!(again.passes(), 1);
    assert_eq!(graph.edges(), &settled);
}

#[rstest]
fn parallel_input_edges_are_folded_and_traced() {
    let raw = [
        RawEdge::new(0.4, 0, 1, 1),
        RawEdge::new(0.8, 1, 0, 2),
        RawEdge::new(0.3, 1, 2, 1),
    ];
    let (graph, layer) = RecordingLayer::capture(|| {
        UndirectedGraph::from_raw_edges(raw, &CreatorStrategy::NoPayload, &MergeStrategy::AvgAffinity)
    });
    let graph = graph.expect("graph builds");

    let folded = graph.edges().get(0).expect("edge 0");
    assert_eq!(folded.multiplicity(), 3);
    assert!(close(folded.affinity(), (0.4 + 2.0 * 0.8) / 3.0));
    assert!(graph.edges().get(1).expect("edge 1").is_obsolete());

    let events = layer.events_with_message("folding parallel edge");
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].level, Level::TRACE);
    assert_eq!(events[0].field("existing"), Some("0"));
}

#[rstest]
fn histogram_strategies_merge_end_to_end() {
    let bins = regionmerge_core::HistogramBins::new(
        std::num::NonZeroUsize::new(20).expect("non-zero"),
        0.0,
        1.0,
    )
    .expect("valid bins");
    let creator = CreatorStrategy::AffinityHistogram(bins);
    let merger = MergeStrategy::MedianHistogram(bins.bins());
    // Two strongly tied pairs joined by one weak edge observed twice.
    let raw = [
        RawEdge::new(0.92, 0, 1, 1),
        RawEdge::new(0.88, 2, 3, 1),
        RawEdge::new(0.12, 1, 2, 1),
        RawEdge::new(0.18, 2, 1, 1),
    ];
    let mut graph = UndirectedGraph::from_raw_edges(raw, &creator, &merger).expect("graph builds");
    let mut sizes = graph.unit_region_sizes();

    let outcome = RegionMergingBuilder::new()
        .with_threshold(0.5)
        .build()
        .expect("valid")
        .run(
            &mut graph,
            &merger,
            &WeightStrategy::MedianHistogram(bins),
            &mut sizes,
            |_, _, _, _| {},
        )
        .expect("run succeeds");

    let mut edges: Vec<_> = outcome.log().iter().map(|record| record.edge).collect();
    edges.sort_unstable();
    assert_eq!(edges, vec![0, 1]);
    let bridge = graph.edges().get(2).expect("edge 2");
    assert!(bridge.is_valid());
    assert_eq!(bridge.payload()[0], 2.0);
    assert_eq!(bridge.multiplicity(), 2);
}

fn scenario_config() -> ProptestConfig {
    let profile = ProptestRunProfile::load(64, false);
    ProptestConfig {
        cases: profile.cases(),
        fork: profile.fork(),
        ..ProptestConfig::default()
    }
}

fn random_graph() -> impl Strategy<Value = Vec<RawEdge>> {
    let affinity = prop_oneof![Just(0.25), Just(0.5), Just(0.75), 0.0_f64..1.0];
    prop::collection::vec((0_u64..12, 0_u64..12, affinity, 1_u64..4), 1..40).prop_map(|edges| {
        edges
            .into_iter()
            .filter(|(from, to, _, _)| from != to)
            .map(|(from, to, affinity, multiplicity)| RawEdge::new(affinity, from, to, multiplicity))
            .collect()
    })
}

proptest! {
    #![proptest_config(scenario_config())]

    #[test]
    fn runs_reach_a_stable_fixpoint(
        raw in random_graph(),
        threshold in 0.0_f64..=1.0,
        minimum_multiplicity in 0_u64..3,
    ) {
        let merger = MergeStrategy::AvgAffinity;
        let mut graph = UndirectedGraph::from_raw_edges(raw, &CreatorStrategy::NoPayload, &merger)
            .expect("graph builds");
        let nodes_before = graph.node_count();
        let mut sizes = graph.unit_region_sizes();
        let merging = RegionMergingBuilder::new()
            .with_threshold(threshold)
            .with_minimum_multiplicity(minimum_multiplicity)
            .build()
            .expect("valid");

        let outcome = merging
            .run(&mut graph, &merger, &WeightStrategy::FunkySquared, &mut sizes, |_, _, _, _| {})
            .expect("run succeeds");

        prop_assert!(outcome.converged());
        prop_assert_eq!(nodes_before - graph.node_count(), outcome.log().len());
        prop_assert_eq!(sizes.values().sum::<u64>(), nodes_before as u64);
        for record in outcome.log() {
            let edge = graph.edges().get(record.edge).expect("logged edge exists");
            prop_assert!(edge.is_obsolete());
            prop_assert!(record.weight <= threshold);
        }

        let again = merging
            .run(&mut graph, &merger, &WeightStrategy::FunkySquared, &mut sizes, |_, _, _, _| {})
            .expect("rerun succeeds");
        prop_assert!(again.log().is_empty());
    }
}
