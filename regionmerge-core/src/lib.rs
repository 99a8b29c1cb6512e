//! Region merging core library.
//!
//! Clusters a weighted undirected graph by repeatedly contracting edges that
//! are local minima of their neighbourhood. Build an [`UndirectedGraph`] from
//! [`RawEdge`] observations, pick strategies for combining and scoring
//! edges, and hand everything to [`RegionMerging::run`].
#![cfg_attr(docsrs, feature(doc_cfg))]

mod edge;
mod error;
mod graph;
mod merging;
mod union_find;

#[cfg(test)]
mod test_utils;

pub use crate::{
    edge::{
        CreatorStrategy, EdgeCreator, EdgeIndex, EdgeMerger, EdgeMut, EdgeRecord, EdgeRef,
        EdgeStatus, EdgeStore, EdgeWeight, HistogramBins, MergeStrategy, NodeId, WeightStrategy,
        median_from_histogram, percentile_from_histogram,
    },
    error::{
        EdgeError, EdgeErrorCode, GraphError, GraphErrorCode, MergeError, MergeErrorCode, Result,
    },
    graph::{Adjacency, RawEdge, UndirectedGraph},
    merging::{MergeOutcome, MergeRecord, RegionMerging, RegionMergingBuilder},
    union_find::SparseUnionFind,
};
