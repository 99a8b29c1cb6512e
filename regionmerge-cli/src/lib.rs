//! Support library for the regionmerge CLI binary.
//!
//! Exposes the command pipeline and logging set-up so doctests and tests can
//! drive them without spawning a subprocess.

pub mod cli;
pub mod logging;
