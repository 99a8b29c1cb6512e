use std::collections::HashMap;

use regionmerge_core::{
    CreatorStrategy, MergeOutcome, MergeStrategy, NodeId, RawEdge, RegionMergingBuilder,
    UndirectedGraph, WeightStrategy,
};

/// Index of the `(2, 3)` edge in [`nine_node_graph`].
pub const BRIDGE_EDGE: usize = 3;
/// Index of the `(3, 4)` edge in [`nine_node_graph`].
pub const SECOND_EDGE: usize = 5;

/// Nine nodes joined by eight edges of affinity `0.1`, except `(2, 3)` and
/// `(3, 4)` which take the given affinities.
///
/// ```text
/// 0   1 - 5
///  \ /
///   2 - 6
///   |
///   3 - 7
///   |
///   4 - 8
/// ```
#[must_use]
pub fn nine_node_graph(bridge: f64, second: f64) -> UndirectedGraph {
    let raw = [
        RawEdge::new(0.1, 0, 2, 1),
        RawEdge::new(0.1, 1, 2, 1),
        RawEdge::new(0.1, 1, 5, 1),
        RawEdge::new(bridge, 2, 3, 1),
        RawEdge::new(0.1, 2, 6, 1),
        RawEdge::new(second, 3, 4, 1),
        RawEdge::new(0.1, 3, 7, 1),
        RawEdge::new(0.1, 4, 8, 1),
    ];
    UndirectedGraph::from_raw_edges(raw, &CreatorStrategy::NoPayload, &MergeStrategy::MinAffinity)
        .expect("scenario graph is well formed")
}

/// Runs the engine with `1 - affinity` weights and the minimum-affinity
/// merger.
pub fn merge_with_threshold(
    graph: &mut UndirectedGraph,
    sizes: &mut HashMap<NodeId, u64>,
    threshold: f64,
) -> MergeOutcome {
    RegionMergingBuilder::new()
        .with_threshold(threshold)
        .build()
        .expect("threshold is valid")
        .run(
            graph,
            &MergeStrategy::MinAffinity,
            &WeightStrategy::OneMinusAffinity,
            sizes,
            |_, _, _, _| {},
        )
        .expect("run succeeds")
}
