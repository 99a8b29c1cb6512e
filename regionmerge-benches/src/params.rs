//! Benchmark parameter labels.

use std::fmt;

/// Parameters for a grid benchmark run.
#[derive(Clone, Debug)]
pub struct GridBenchParams {
    /// Nodes per grid side.
    pub side: u64,
    /// Observations recorded for every grid edge.
    pub observations: u64,
}

impl fmt::Display for GridBenchParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{0}x{0},obs={1}", self.side, self.observations)
    }
}
