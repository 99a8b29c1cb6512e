//! Shared test utilities for `regionmerge-core`.

use proptest::test_runner::Config as ProptestConfig;
use regionmerge_test_support::property_test_profile::ProptestRunProfile;

use crate::{
    edge::{EdgeRecord, EdgeStore, MergeStrategy, NodeId},
    graph::UndirectedGraph,
};

/// Builds a proptest configuration from the shared run profile.
///
/// Keeps every property suite on the same `PROPTEST_CASES` and
/// `REGIONMERGE_PBT_FORK` interpretation.
#[must_use]
pub(crate) fn suite_proptest_config(default_cases: u32) -> ProptestConfig {
    let profile = ProptestRunProfile::load(default_cases, false);
    ProptestConfig {
        cases: profile.cases(),
        fork: profile.fork(),
        ..ProptestConfig::default()
    }
}

/// Builds a payload-free graph whose records already carry weights, one per
/// `(from, to, weight)` triple. Affinity is set to `1 - weight`.
pub(crate) fn weighted_graph(edges: &[(NodeId, NodeId, f64)]) -> UndirectedGraph {
    let mut store = EdgeStore::new(0);
    for &(from, to, weight) in edges {
        let record = EdgeRecord::new(1.0 - weight, from, to, 1).with_weight(weight);
        store
            .append(record, &[])
            .expect("payload-free append succeeds");
    }
    UndirectedGraph::from_store(store, &MergeStrategy::MinAffinity)
        .expect("weighted test graph is well formed")
}
