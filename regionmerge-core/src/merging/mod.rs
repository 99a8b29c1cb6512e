//! Agglomerative merging of graph regions by local-minimum contraction.
//!
//! A run repeats passes until one of them contracts nothing. Each pass
//! refreshes stale weights, classifies every live edge against the edges
//! sharing an endpoint with it, and then contracts:
//!
//! 1. every *clean* local minimum, an edge strictly lighter than all of its
//!    neighbours, and
//! 2. every member of a *plateau*, a group of equal-weight neighbouring edges,
//!    provided that every member of the group is itself a local minimum.
//!
//! Ties are therefore resolved as a whole or not at all, so the result never
//! depends on the order in which equal-weight edges are visited.

mod builder;
mod classify;

use std::{
    collections::{HashMap, HashSet},
    num::NonZeroUsize,
};

use tracing::{debug, instrument, trace, warn};

use crate::{
    Result,
    edge::{EdgeIndex, EdgeMerger, EdgeWeight, NodeId},
    error::{GraphError, MergeError},
    graph::UndirectedGraph,
    union_find::SparseUnionFind,
};

pub use self::builder::RegionMergingBuilder;
use self::classify::{Classification, Gates};

/// One accepted contraction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MergeRecord {
    /// Index of the contracted edge.
    pub edge: EdgeIndex,
    /// Weight of the edge when it contracted.
    pub weight: f64,
    /// Root of the first endpoint's region before the merge.
    pub region1: NodeId,
    /// Root of the second endpoint's region before the merge.
    pub region2: NodeId,
}

impl MergeRecord {
    /// Returns the raw IEEE-754 bits of [`Self::weight`].
    #[must_use]
    pub const fn weight_bits(&self) -> u64 {
        self.weight.to_bits()
    }
}

/// Result of [`RegionMerging::run`].
#[derive(Clone, Debug)]
pub struct MergeOutcome {
    log: Vec<MergeRecord>,
    regions: SparseUnionFind<NodeId>,
    passes: usize,
    converged: bool,
}

impl MergeOutcome {
    /// Returns the accepted contractions in the order they happened.
    #[must_use]
    #[rustfmt::skip]
    pub fn log(&self) -> &[MergeRecord] { &self.log }

    /// Returns the node-to-region union-find built by the run.
    #[must_use]
    #[rustfmt::skip]
    pub fn regions(&self) -> &SparseUnionFind<NodeId> { &self.regions }

    /// Returns the number of passes taken, the final unchanged pass included.
    #[must_use]
    #[rustfmt::skip]
    pub fn passes(&self) -> usize { self.passes }

    /// Returns `true` when the run stopped because a pass contracted nothing,
    /// and `false` when the pass cap stopped it first.
    #[must_use]
    #[rustfmt::skip]
    pub fn converged(&self) -> bool { self.converged }

    /// Splits the outcome into the merge log and the region union-find.
    #[must_use]
    pub fn into_parts(self) -> (Vec<MergeRecord>, SparseUnionFind<NodeId>) {
        (self.log, self.regions)
    }
}

/// Validated merging configuration. Construct through
/// [`RegionMergingBuilder`].
///
/// # Examples
/// ```
/// use regionmerge_core::{
///     CreatorStrategy, MergeStrategy, RawEdge, RegionMergingBuilder, UndirectedGraph,
///     WeightStrategy,
/// };
///
/// let raw = [
///     RawEdge::new(0.9, 0, 1, 1),
///     RawEdge::new(0.2, 1, 2, 1),
///     RawEdge::new(0.1, 2, 3, 1),
/// ];
/// let merger = MergeStrategy::MinAffinity;
/// let mut graph = UndirectedGraph::from_raw_edges(raw, &CreatorStrategy::NoPayload, &merger)?;
/// let mut sizes = graph.unit_region_sizes();
///
/// let merging = RegionMergingBuilder::new().with_threshold(0.5).build()?;
/// let outcome = merging.run(
///     &mut graph,
///     &merger,
///     &WeightStrategy::OneMinusAffinity,
///     &mut sizes,
///     |_, _, _, _| {},
/// )?;
/// assert_eq!(outcome.log().len(), 1);
/// assert_eq!(outcome.log()[0].edge, 0);
/// assert_eq!(sizes.values().sum::<u64>(), 4);
/// # Ok::<(), regionmerge_core::MergeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct RegionMerging {
    threshold: f64,
    minimum_multiplicity: u64,
    non_contracting_edges: HashSet<EdgeIndex>,
    max_passes: Option<NonZeroUsize>,
}

impl RegionMerging {
    /// Returns the weight threshold.
    #[must_use]
    #[rustfmt::skip]
    pub fn threshold(&self) -> f64 { self.threshold }

    /// Returns the multiplicity gate.
    #[must_use]
    #[rustfmt::skip]
    pub fn minimum_multiplicity(&self) -> u64 { self.minimum_multiplicity }

    /// Returns the edges that never contract.
    #[must_use]
    #[rustfmt::skip]
    pub fn non_contracting_edges(&self) -> &HashSet<EdgeIndex> { &self.non_contracting_edges }

    /// Returns the pass cap, if any.
    #[must_use]
    #[rustfmt::skip]
    pub fn max_passes(&self) -> Option<NonZeroUsize> { self.max_passes }

    /// Contracts `graph` until no pass finds a contraction, or until the pass
    /// cap is reached.
    ///
    /// `region_sizes` maps region roots to their number of original nodes
    /// and is kept in step with every join; regions missing from it count as
    /// size `1`. `on_merge` is called once per accepted contraction, in merge
    /// order, with `(region1, region2, new_region, weight)`.
    ///
    /// # Errors
    /// Returns [`MergeError::PayloadLengthMismatch`] or a wrapped
    /// [`GraphError::PayloadLengthMismatch`] when the strategies do not fit
    /// the graph's payload, and any error raised by a contraction. A failed
    /// contraction aborts the run and leaves the graph partly contracted.
    #[instrument(
        name = "core.merge_run",
        err,
        skip(self, graph, merger, weight, region_sizes, on_merge),
        fields(
            edges = graph.edges().len(),
            threshold = self.threshold,
            minimum_multiplicity = self.minimum_multiplicity,
        ),
    )]
    pub fn run<M, W, F>(
        &self,
        graph: &mut UndirectedGraph,
        merger: &M,
        weight: &W,
        region_sizes: &mut HashMap<NodeId, u64>,
        mut on_merge: F,
    ) -> Result<MergeOutcome>
    where
        M: EdgeMerger + ?Sized,
        W: EdgeWeight + ?Sized,
        F: FnMut(NodeId, NodeId, NodeId, f64),
    {
        let store_len = graph.edges().payload_len();
        if merger.payload_len() != store_len {
            return Err(GraphError::PayloadLengthMismatch {
                creator: store_len,
                merger: merger.payload_len(),
            }
            .into());
        }
        if let Some(expected) = weight.payload_len()
            && expected != store_len
        {
            return Err(MergeError::PayloadLengthMismatch {
                weight: expected,
                store: store_len,
            });
        }

        let gates = Gates {
            threshold: self.threshold,
            minimum_multiplicity: self.minimum_multiplicity,
            non_contracting: &self.non_contracting_edges,
        };
        let mut pass = Pass {
            graph,
            merger,
            regions: SparseUnionFind::new(),
            region_sizes,
            log: Vec::new(),
            on_merge: &mut on_merge,
        };

        let mut passes = 0;
        let converged = loop {
            passes += 1;
            pass.reweight(weight)?;
            let mut classification = Classification::new(&*pass.graph, &gates);
            let before = pass.log.len();

            for index in 0..pass.graph.edges().len() {
                if classification.is_clean_minimum(index, &gates) && pass.is_live(index, &gates) {
                    pass.merge_edge(index)?;
                }
            }
            for index in classification.qualifying_plateau_edges(&gates) {
                if pass.is_live(index, &gates) {
                    pass.merge_edge(index)?;
                }
            }

            let contractions = pass.log.len() - before;
            debug!(
                pass = passes,
                minima = classification.minima(),
                plateau_edges = classification.plateau_edges(),
                contractions,
                "finished merging pass",
            );
            record_pass(contractions);

            if contractions == 0 {
                break true;
            }
            if self.max_passes.is_some_and(|cap| passes >= cap.get()) {
                warn!(passes, merges = pass.log.len(), "pass cap reached before fixpoint");
                break false;
            }
        };

        Ok(MergeOutcome {
            log: pass.log,
            regions: pass.regions,
            passes,
            converged,
        })
    }
}

/// State shared by the passes of one run.
struct Pass<'a, M: ?Sized, F> {
    graph: &'a mut UndirectedGraph,
    merger: &'a M,
    regions: SparseUnionFind<NodeId>,
    region_sizes: &'a mut HashMap<NodeId, u64>,
    log: Vec<MergeRecord>,
    on_merge: &'a mut F,
}

impl<M, F> Pass<'_, M, F>
where
    M: EdgeMerger + ?Sized,
    F: FnMut(NodeId, NodeId, NodeId, f64),
{
    /// Recomputes the weight of every live stale edge and pins obsolete
    /// edges to `+inf`.
    fn reweight<W: EdgeWeight + ?Sized>(&mut self, weight: &W) -> Result<()> {
        for index in 0..self.graph.edges().len() {
            let edge = self.graph.edges().try_get(index)?;
            let refreshed = if edge.is_obsolete() {
                f64::INFINITY
            } else if edge.is_stale() {
                let size1 = region_size(&mut self.regions, self.region_sizes, edge.from());
                let size2 = region_size(&mut self.regions, self.region_sizes, edge.to());
                weight.weight(edge, size1, size2)
            } else {
                continue;
            };
            let mut edge = self.graph.edges_mut().try_get_mut(index)?;
            edge.set_weight(refreshed);
            edge.mark_active();
        }
        Ok(())
    }

    /// Contractions earlier in the pass may have retired or regrown an edge.
    fn is_live(&self, index: EdgeIndex, gates: &Gates<'_>) -> bool {
        self.graph
            .edges()
            .get(index)
            .is_some_and(|edge| gates.admits(edge))
    }

    /// Contracts `index` unless its endpoints already share a region.
    fn merge_edge(&mut self, index: EdgeIndex) -> Result<bool> {
        let edge = self.graph.edges().try_get(index)?;
        let (from, to, weight) = (edge.from(), edge.to(), edge.weight());

        let region1 = self.regions.find_root(from);
        let region2 = self.regions.find_root(to);
        if region1 == region2 {
            return Ok(false);
        }
        let merged = self.regions.join(region1, region2);

        let size1 = self.region_sizes.remove(&region1).unwrap_or(1);
        let size2 = self.region_sizes.remove(&region2).unwrap_or(1);
        self.region_sizes.insert(merged, size1.saturating_add(size2));

        self.log.push(MergeRecord {
            edge: index,
            weight,
            region1,
            region2,
        });
        (self.on_merge)(region1, region2, merged, weight);
        trace!(edge = index, region1, region2, merged, weight, "contracting edge");

        self.graph.contract(index, merged, self.merger)?;
        Ok(true)
    }
}

fn region_size(
    regions: &mut SparseUnionFind<NodeId>,
    sizes: &HashMap<NodeId, u64>,
    node: NodeId,
) -> u64 {
    sizes.get(&regions.find_root(node)).copied().unwrap_or(1)
}

#[cfg(feature = "metrics")]
fn record_pass(contractions: usize) {
    metrics::counter!("region_merging_passes").increment(1);
    metrics::counter!("region_merging_contractions").increment(contractions as u64);
}

#[cfg(not(feature = "metrics"))]
fn record_pass(_contractions: usize) {}

#[cfg(test)]
mod tests;
