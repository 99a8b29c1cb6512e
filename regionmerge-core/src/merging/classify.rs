//! Per-pass classification of edges into local minima and plateaus.

use std::collections::{HashMap, HashSet};

use crate::{
    edge::{EdgeIndex, EdgeRef},
    graph::UndirectedGraph,
    union_find::SparseUnionFind,
};

/// Gates applied while classifying.
#[derive(Clone, Copy, Debug)]
pub(super) struct Gates<'a> {
    pub(super) threshold: f64,
    pub(super) minimum_multiplicity: u64,
    pub(super) non_contracting: &'a HashSet<EdgeIndex>,
}

impl Gates<'_> {
    /// An edge takes part in classification iff it is live and carries
    /// enough observations.
    pub(super) fn admits(&self, edge: EdgeRef<'_>) -> bool {
        edge.is_valid() && edge.multiplicity() >= self.minimum_multiplicity
    }

    pub(super) fn contractible(&self, index: EdgeIndex) -> bool {
        !self.non_contracting.contains(&index)
    }
}

/// Snapshot of one pass, taken before any contraction of that pass.
#[derive(Debug)]
pub(super) struct Classification {
    local_minimum: Vec<bool>,
    in_plateau: Vec<bool>,
    near_non_contracting: Vec<bool>,
    plateaus: SparseUnionFind<EdgeIndex>,
}

impl Classification {
    /// Classifies every admitted edge of `graph` against its admitted
    /// neighbours.
    ///
    /// An edge is a local minimum when its weight exceeds neither the
    /// threshold nor the weight of any neighbouring edge. Neighbours of equal
    /// weight are joined into one plateau.
    pub(super) fn new(graph: &UndirectedGraph, gates: &Gates<'_>) -> Self {
        let len = graph.edges().len();
        let mut classification = Self {
            local_minimum: vec![false; len],
            in_plateau: vec![false; len],
            near_non_contracting: vec![false; len],
            plateaus: SparseUnionFind::new(),
        };

        for edge in graph.edges().iter() {
            if !gates.admits(edge) {
                continue;
            }
            let index = edge.index();
            let weight = edge.weight();
            if weight > gates.threshold {
                continue;
            }

            let mut minimum = f64::INFINITY;
            for node in [edge.from(), edge.to()] {
                for (neighbour, other) in graph.neighbours(node) {
                    if other == index || neighbour == node {
                        continue;
                    }
                    let Some(other_edge) = graph.edges().get(other) else {
                        continue;
                    };
                    if !gates.admits(other_edge) {
                        continue;
                    }
                    if !gates.contractible(other) {
                        classification.near_non_contracting[index] = true;
                    }
                    minimum = minimum.min(other_edge.weight());
                    if weight == other_edge.weight() {
                        classification.in_plateau[index] = true;
                        classification.plateaus.join(index, other);
                    }
                }
            }
            classification.local_minimum[index] = weight <= minimum;
        }

        classification
    }

    /// A lone local minimum that may contract on its own.
    pub(super) fn is_clean_minimum(&self, index: EdgeIndex, gates: &Gates<'_>) -> bool {
        self.local_minimum[index]
            && !self.in_plateau[index]
            && gates.contractible(index)
            && !self.near_non_contracting[index]
    }

    /// Returns the plateau edges whose whole plateau qualifies, in index
    /// order. A plateau qualifies only if every member is a contractible
    /// local minimum with no non-contracting neighbour.
    pub(super) fn qualifying_plateau_edges(&mut self, gates: &Gates<'_>) -> Vec<EdgeIndex> {
        let members: Vec<EdgeIndex> = (0..self.in_plateau.len())
            .filter(|&index| self.in_plateau[index])
            .collect();

        let mut qualifies: HashMap<EdgeIndex, bool> = HashMap::new();
        for &index in &members {
            let root = self.plateaus.find_root(index);
            let member_ok = self.local_minimum[index]
                && gates.contractible(index)
                && !self.near_non_contracting[index];
            *qualifies.entry(root).or_insert(true) &= member_ok;
        }

        members
            .into_iter()
            .filter(|&index| {
                let root = self.plateaus.find_root(index);
                qualifies.get(&root).copied().unwrap_or(false)
            })
            .collect()
    }

    /// Number of local minima found in the pass.
    pub(super) fn minima(&self) -> usize {
        self.local_minimum.iter().filter(|&&flag| flag).count()
    }

    /// Number of edges that belong to some plateau.
    pub(super) fn plateau_edges(&self) -> usize {
        self.in_plateau.iter().filter(|&&flag| flag).count()
    }
}
