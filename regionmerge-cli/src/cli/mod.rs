//! Command-line interface orchestration for region merging.
//!
//! The CLI offers a single `merge` command that reads a plain-text edge list,
//! runs the merging engine with the selected strategies, and prints the
//! merge log.

mod commands;
mod edge_list;

pub use commands::{
    Cli, CliError, Command, ExecutionSummary, MergeCommand, MergerKind, WeightKind,
    render_summary, run_cli,
};
pub use edge_list::{EdgeListError, read_edge_list};
