//! Synthetic grid graphs.
//!
//! Nodes sit on a `width x height` lattice and connect to their right and
//! lower neighbours. The lattice is tiled into square blocks: edges inside a
//! block draw high affinities and edges crossing a block boundary draw low
//! ones, so merging should recover the blocks.

use rand::{Rng, SeedableRng, rngs::SmallRng};
use regionmerge_core::{NodeId, RawEdge};
use thiserror::Error;

/// Errors raised while generating a grid.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum GridError {
    /// The grid must have at least two nodes along some axis.
    #[error("grid {width}x{height} has no edges")]
    Degenerate {
        /// Requested width.
        width: u64,
        /// Requested height.
        height: u64,
    },
    /// Block side must be positive.
    #[error("block side must be positive")]
    ZeroBlock,
    /// Every edge needs at least one observation.
    #[error("observations per edge must be positive")]
    ZeroObservations,
}

/// Layout and randomness of a generated grid.
#[derive(Clone, Copy, Debug)]
pub struct GridConfig {
    /// Nodes per row.
    pub width: u64,
    /// Nodes per column.
    pub height: u64,
    /// Side of the high-affinity blocks.
    pub block: u64,
    /// Raw observations emitted per lattice edge; values above one produce
    /// parallel edges for the graph to fold.
    pub observations: u64,
    /// Seed for the affinity generator.
    pub seed: u64,
}

impl GridConfig {
    /// Square grid of `side x side` nodes with a single observation per edge.
    #[must_use]
    pub const fn square(side: u64, block: u64, seed: u64) -> Self {
        Self {
            width: side,
            height: side,
            block,
            observations: 1,
            seed,
        }
    }

    const fn node(&self, x: u64, y: u64) -> NodeId {
        y * self.width + x
    }

    fn validate(&self) -> Result<(), GridError> {
        if self.width.saturating_mul(self.height) < 2 {
            return Err(GridError::Degenerate {
                width: self.width,
                height: self.height,
            });
        }
        if self.block == 0 {
            return Err(GridError::ZeroBlock);
        }
        if self.observations == 0 {
            return Err(GridError::ZeroObservations);
        }
        Ok(())
    }
}

/// Generates the raw observations of the grid described by `config`.
///
/// Observations of one lattice edge alternate orientation, so parallel edges
/// arrive both as `(a, b)` and `(b, a)`.
///
/// # Errors
/// Returns [`GridError`] when the configuration cannot produce edges.
///
/// # Examples
/// ```
/// use regionmerge_benches::grid::{GridConfig, grid_edges};
///
/// let edges = grid_edges(&GridConfig::square(4, 2, 7))?;
/// assert_eq!(edges.len(), 24);
/// # Ok::<(), regionmerge_benches::grid::GridError>(())
/// ```
pub fn grid_edges(config: &GridConfig) -> Result<Vec<RawEdge>, GridError> {
    config.validate()?;
    let mut rng = SmallRng::seed_from_u64(config.seed);
    let mut edges = Vec::new();
    for y in 0..config.height {
        for x in 0..config.width {
            let here = config.node(x, y);
            if x + 1 < config.width {
                let crosses = (x + 1).is_multiple_of(config.block);
                push_observations(config, &mut rng, &mut edges, (here, config.node(x + 1, y)), crosses);
            }
            if y + 1 < config.height {
                let crosses = (y + 1).is_multiple_of(config.block);
                push_observations(config, &mut rng, &mut edges, (here, config.node(x, y + 1)), crosses);
            }
        }
    }
    Ok(edges)
}

fn push_observations(
    config: &GridConfig,
    rng: &mut SmallRng,
    edges: &mut Vec<RawEdge>,
    (a, b): (NodeId, NodeId),
    crosses_block: bool,
) {
    for observation in 0..config.observations {
        let affinity = if crosses_block {
            rng.gen_range(0.0..0.4)
        } else {
            rng.gen_range(0.6..1.0)
        };
        let (from, to) = if observation.is_multiple_of(2) { (a, b) } else { (b, a) };
        edges.push(RawEdge::new(affinity, from, to, 1));
    }
}
