//! Benchmark support crate for region merging.
//!
//! Generates synthetic grid graphs and parameter labels for the Criterion
//! benchmarks that time graph construction and the merging engine.

pub mod error;
pub mod grid;
pub mod params;
