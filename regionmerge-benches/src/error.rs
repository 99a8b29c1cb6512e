//! Benchmark setup error type.
//!
//! Lets setup code propagate failures with `?` instead of `.expect()`.

use regionmerge_core::{EdgeError, GraphError, MergeError};

use crate::grid::GridError;

/// Errors that may occur during benchmark setup.
#[derive(Debug, thiserror::Error)]
pub enum BenchSetupError {
    /// Grid generation parameters were rejected.
    #[error("grid generation failed: {0}")]
    Grid(#[from] GridError),
    /// Histogram layout or weight parameters were rejected.
    #[error("strategy setup failed: {0}")]
    Strategy(#[from] EdgeError),
    /// The graph could not be built.
    #[error("graph construction failed: {0}")]
    Graph(#[from] GraphError),
    /// The merging engine failed.
    #[error("merging failed: {0}")]
    Merge(#[from] MergeError),
    /// A zero value was passed where a non-zero integer was required.
    #[error("expected a non-zero value for {context}")]
    ZeroValue {
        /// The parameter that was unexpectedly zero.
        context: &'static str,
    },
}
