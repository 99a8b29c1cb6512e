//! Undirected graph over an [`EdgeStore`] with per-node adjacency maps.
//!
//! The graph owns the only mutable path into its edge store after
//! construction: [`UndirectedGraph::contract`]. Adjacency is kept symmetric,
//! so for every live edge `e = (a, b)` both `adjacency[a][b]` and
//! `adjacency[b][a]` hold the index of `e`, and no node reaches the same
//! neighbour through two live edges.

use std::collections::HashMap;

use tracing::trace;

use crate::{
    edge::{EdgeCreator, EdgeIndex, EdgeMerger, EdgeRecord, EdgeStore, NodeId},
    error::GraphError,
};

/// Neighbour-to-edge map of one node.
pub type Adjacency = HashMap<NodeId, EdgeIndex>;

/// One raw observation fed to graph construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawEdge {
    /// Connection strength between the endpoints.
    pub affinity: f64,
    /// First endpoint.
    pub from: NodeId,
    /// Second endpoint.
    pub to: NodeId,
    /// Number of observations folded into this edge.
    pub multiplicity: u64,
}

impl RawEdge {
    /// Creates a raw edge.
    #[must_use]
    pub const fn new(affinity: f64, from: NodeId, to: NodeId, multiplicity: u64) -> Self {
        Self {
            affinity,
            from,
            to,
            multiplicity,
        }
    }
}

/// Edge store plus symmetric adjacency.
#[derive(Clone, Debug, Default)]
pub struct UndirectedGraph {
    edges: EdgeStore,
    adjacency: HashMap<NodeId, Adjacency>,
}

impl UndirectedGraph {
    /// Builds a graph from raw observations.
    ///
    /// Each observation becomes one record whose payload is written by
    /// `creator`. Parallel observations of the same node pair are folded into
    /// the first one with `merger`; the later record stays in the store as
    /// obsolete.
    ///
    /// # Errors
    /// Returns [`GraphError::SelfLoop`] or [`GraphError::NonFiniteAffinity`]
    /// for malformed input, [`GraphError::PayloadLengthMismatch`] when the
    /// creator and merger disagree, and any error raised while folding
    /// parallel edges.
    ///
    /// # Examples
    /// ```
    /// use regionmerge_core::{CreatorStrategy, MergeStrategy, RawEdge, UndirectedGraph};
    ///
    /// let raw = [
    ///     RawEdge::new(0.2, 0, 1, 1),
    ///     RawEdge::new(0.6, 1, 0, 1),
    ///     RawEdge::new(0.4, 1, 2, 1),
    /// ];
    /// let graph = UndirectedGraph::from_raw_edges(
    ///     raw,
    ///     &CreatorStrategy::NoPayload,
    ///     &MergeStrategy::MaxAffinity,
    /// )?;
    /// assert_eq!(graph.live_edge_count(), 2);
    /// let merged = graph.edge_between(0, 1).expect("edge exists");
    /// assert_eq!(merged, 0);
    /// assert_eq!(graph.edges().get(0).map(|e| e.multiplicity()), Some(2));
    /// # Ok::<(), regionmerge_core::GraphError>(())
    /// ```
    pub fn from_raw_edges<I, C, M>(edges: I, creator: &C, merger: &M) -> Result<Self, GraphError>
    where
        I: IntoIterator<Item = RawEdge>,
        C: EdgeCreator + ?Sized,
        M: EdgeMerger + ?Sized,
    {
        let payload_len = creator.payload_len();
        if payload_len != merger.payload_len() {
            return Err(GraphError::PayloadLengthMismatch {
                creator: payload_len,
                merger: merger.payload_len(),
            });
        }

        let edges = edges.into_iter();
        let mut store = EdgeStore::with_capacity(payload_len, edges.size_hint().0);
        for raw in edges {
            if raw.from == raw.to {
                return Err(GraphError::SelfLoop { node: raw.from });
            }
            if !raw.affinity.is_finite() {
                return Err(GraphError::NonFiniteAffinity {
                    from: raw.from,
                    to: raw.to,
                });
            }
            let record = EdgeRecord::new(raw.affinity, raw.from, raw.to, raw.multiplicity);
            store.append_with(record, |payload| creator.fill_payload(&raw, payload));
        }

        Self::from_store(store, merger)
    }

    /// Builds adjacency over an existing store.
    ///
    /// Obsolete records are ignored. Parallel records are folded exactly as
    /// in [`Self::from_raw_edges`].
    ///
    /// # Errors
    /// Returns [`GraphError::PayloadLengthMismatch`] when `merger` expects a
    /// different payload than `store` holds, [`GraphError::SelfLoop`] for a
    /// live self-loop record, and any error raised while folding parallel
    /// edges.
    pub fn from_store<M>(store: EdgeStore, merger: &M) -> Result<Self, GraphError>
    where
        M: EdgeMerger + ?Sized,
    {
        if store.payload_len() != merger.payload_len() {
            return Err(GraphError::PayloadLengthMismatch {
                creator: store.payload_len(),
                merger: merger.payload_len(),
            });
        }

        let mut graph = Self {
            edges: store,
            adjacency: HashMap::new(),
        };
        for index in 0..graph.edges.len() {
            let edge = graph.edges.try_get(index)?;
            if edge.is_obsolete() {
                continue;
            }
            let (from, to) = (edge.from(), edge.to());
            if from == to {
                return Err(GraphError::SelfLoop { node: from });
            }

            match graph.edge_between(from, to) {
                Some(existing) => {
                    trace!(edge = index, existing, from, to, "folding parallel edge");
                    graph.edges.merge(index, existing, merger)?;
                    graph.edges.try_get_mut(existing)?.mark_stale();
                    graph.edges.try_get_mut(index)?.mark_obsolete();
                }
                None => {
                    graph.adjacency.entry(from).or_default().insert(to, index);
                    graph.adjacency.entry(to).or_default().insert(from, index);
                }
            }
        }

        Ok(graph)
    }

    /// Returns the edge store.
    #[must_use]
    #[rustfmt::skip]
    pub fn edges(&self) -> &EdgeStore { &self.edges }

    #[rustfmt::skip]
    pub(crate) fn edges_mut(&mut self) -> &mut EdgeStore { &mut self.edges }

    /// Iterates over `(neighbour, edge)` pairs of `node`. Unknown nodes have
    /// no neighbours.
    pub fn neighbours(&self, node: NodeId) -> impl Iterator<Item = (NodeId, EdgeIndex)> + '_ {
        self.adjacency
            .get(&node)
            .into_iter()
            .flat_map(|adjacency| adjacency.iter().map(|(&n, &e)| (n, e)))
    }

    /// Returns the live edge joining `a` and `b`, if any.
    #[must_use]
    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<EdgeIndex> {
        self.adjacency.get(&a)?.get(&b).copied()
    }

    /// Returns `true` when `node` is present in the graph.
    #[must_use]
    pub fn contains_node(&self, node: NodeId) -> bool {
        self.adjacency.contains_key(&node)
    }

    /// Returns the number of nodes with an adjacency entry. Nodes absorbed by
    /// a contraction are no longer counted.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.adjacency.len()
    }

    /// Returns the number of records that are not obsolete.
    #[must_use]
    pub fn live_edge_count(&self) -> usize {
        self.edges.iter().filter(|edge| edge.is_valid()).count()
    }

    /// Returns a region-size map assigning `1` to every node of the graph.
    #[must_use]
    pub fn unit_region_sizes(&self) -> HashMap<NodeId, u64> {
        self.adjacency.keys().map(|&node| (node, 1)).collect()
    }

    /// Collapses `edge` so that its endpoint other than `new_node` is
    /// absorbed by `new_node`.
    ///
    /// The contracted edge becomes obsolete. Every edge of the absorbed node
    /// is moved onto `new_node`; when `new_node` already reaches the same
    /// neighbour, the record with the smaller weight survives, absorbs the
    /// other through `merger`, and the other becomes obsolete. Every edge left
    /// on `new_node` is marked stale, marked valid and rewritten to run from
    /// its neighbour to `new_node`.
    ///
    /// Returns the absorbed node's adjacency as it stood before the move.
    ///
    /// # Errors
    /// Returns [`GraphError::ObsoleteEdge`] or [`GraphError::NotAnEndpoint`]
    /// when the request is malformed, and any error raised by `merger` while
    /// reconciling parallel edges. Every parallel pair is passed through
    /// [`EdgeMerger::check`] first, so a rejected reconciliation leaves the
    /// graph untouched.
    pub fn contract<M>(
        &mut self,
        edge: EdgeIndex,
        new_node: NodeId,
        merger: &M,
    ) -> Result<Adjacency, GraphError>
    where
        M: EdgeMerger + ?Sized,
    {
        let contracted = self.edges.try_get(edge)?;
        if contracted.is_obsolete() {
            return Err(GraphError::ObsoleteEdge { index: edge });
        }
        let (from, to) = (contracted.from(), contracted.to());
        let Some(other) = contracted.record().opposite(new_node) else {
            return Err(GraphError::NotAnEndpoint {
                index: edge,
                node: new_node,
                from,
                to,
            });
        };

        let reconciliations = self.plan_reconciliations(other, new_node, merger)?;
        for &(_, survivor, loser) in &reconciliations {
            self.edges.merge(loser, survivor, merger)?;
        }

        self.edges.try_get_mut(edge)?.mark_obsolete();

        let mut discarded = self.adjacency.remove(&other).unwrap_or_default();
        discarded.remove(&new_node);
        let mut kept = self.adjacency.remove(&new_node).unwrap_or_default();
        kept.remove(&other);

        for (&neighbour, &moved) in &discarded {
            if neighbour == other || self.edges.try_get(moved)?.is_obsolete() {
                self.edges.try_get_mut(moved)?.mark_obsolete();
                continue;
            }
            kept.entry(neighbour).or_insert(moved);
        }
        for (neighbour, survivor, loser) in reconciliations {
            self.edges.try_get_mut(loser)?.mark_obsolete();
            kept.insert(neighbour, survivor);
            trace!(survivor, loser, neighbour, new_node, "reconciled parallel edges");
        }

        for (&neighbour, &index) in &kept {
            if let Some(adjacency) = self.adjacency.get_mut(&neighbour) {
                adjacency.remove(&from);
                adjacency.remove(&to);
                adjacency.insert(new_node, index);
            }
            let mut record = self.edges.try_get_mut(index)?;
            record.mark_stale();
            record.mark_valid();
            record.set_endpoints(neighbour, new_node);
        }
        self.adjacency.insert(new_node, kept);

        Ok(discarded)
    }

    /// Pairs every live edge of `absorbed` with the edge of `survivor` that
    /// reaches the same neighbour, as `(neighbour, lighter, heavier)`, and
    /// checks each pair against `merger`. Reads only.
    fn plan_reconciliations<M>(
        &self,
        absorbed: NodeId,
        survivor: NodeId,
        merger: &M,
    ) -> Result<Vec<(NodeId, EdgeIndex, EdgeIndex)>, GraphError>
    where
        M: EdgeMerger + ?Sized,
    {
        let (Some(moving), Some(staying)) =
            (self.adjacency.get(&absorbed), self.adjacency.get(&survivor))
        else {
            return Ok(Vec::new());
        };

        let mut pairs = Vec::new();
        for (&neighbour, &moved) in moving {
            if neighbour == survivor || neighbour == absorbed {
                continue;
            }
            let Some(&existing) = staying.get(&neighbour) else {
                continue;
            };
            let moved_edge = self.edges.try_get(moved)?;
            if existing == moved || moved_edge.is_obsolete() {
                continue;
            }
            let existing_edge = self.edges.try_get(existing)?;
            let (lighter, heavier) = if moved_edge.weight() < existing_edge.weight() {
                (moved_edge, existing_edge)
            } else {
                (existing_edge, moved_edge)
            };
            merger.check(heavier, lighter)?;
            pairs.push((neighbour, lighter.index(), heavier.index()));
        }
        Ok(pairs)
    }
}
