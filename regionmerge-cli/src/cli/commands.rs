//! Command implementations and argument parsing for the regionmerge CLI.

use std::fs::File;
use std::io::{self, BufReader, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use regionmerge_core::{
    CreatorStrategy, EdgeError, EdgeIndex, GraphError, HistogramBins, MergeError, MergeOutcome,
    MergeStrategy, RawEdge, RegionMergingBuilder, UndirectedGraph, WeightStrategy,
};
use thiserror::Error;
use tracing::{Span, field, info, instrument};

use super::edge_list::{EdgeListError, read_edge_list};

const DEFAULT_BINS: &str = "20";

/// Top-level CLI options parsed by [`clap`].
#[derive(Debug, Parser, Clone)]
#[command(
    name = "regionmerge",
    about = "Cluster a weighted graph by contracting locally minimal edges."
)]
pub struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    pub command: Command,
}

/// Supported CLI commands.
#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Merge the graph described by an edge list and print the merge log.
    Merge(MergeCommand),
}

/// Options accepted by the `merge` command.
#[derive(Debug, Args, Clone)]
pub struct MergeCommand {
    /// Edge list with one `from to affinity [multiplicity]` line per edge.
    pub path: PathBuf,

    /// How parallel and contracted edges combine.
    #[arg(long, value_enum, default_value_t = MergerKind::Min)]
    pub merger: MergerKind,

    /// How an edge is scored.
    #[arg(long, value_enum, default_value_t = WeightKind::OneMinusAffinity)]
    pub weight: WeightKind,

    /// Histogram bin count for the histogram strategies.
    #[arg(long, default_value = DEFAULT_BINS)]
    pub bins: NonZeroUsize,

    /// Lower bound of the histogram value range.
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub min: f64,

    /// Upper bound of the histogram value range.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub max: f64,

    /// Percentile in `[0, 1]` read by the `percentile` weight.
    #[arg(long, default_value_t = 0.5)]
    pub percentile: f64,

    /// Edges heavier than this never contract.
    #[arg(long, default_value_t = 1.0, allow_negative_numbers = true)]
    pub threshold: f64,

    /// Edges observed fewer times than this are ignored.
    #[arg(long = "minimum-multiplicity", default_value_t = 0)]
    pub minimum_multiplicity: u64,

    /// Index of an edge that must never contract. Repeatable.
    #[arg(long = "non-contracting", value_name = "INDEX", action = ArgAction::Append)]
    pub non_contracting: Vec<EdgeIndex>,

    /// Stop after this many passes even without a fixpoint.
    #[arg(long = "max-passes")]
    pub max_passes: Option<NonZeroUsize>,
}

/// Selectable edge mergers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MergerKind {
    /// Keep the larger affinity.
    Max,
    /// Keep the smaller affinity.
    Min,
    /// Multiplicity-weighted mean affinity.
    Avg,
    /// Sum affinity histograms.
    MedianHistogram,
}

/// Selectable edge weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum WeightKind {
    /// `1 - affinity`.
    OneMinusAffinity,
    /// Scaled by the smaller region.
    Funky,
    /// Squared and scaled by the smaller region.
    FunkySquared,
    /// `1 - median` of the affinity histogram.
    MedianHistogram,
    /// `1 - percentile` of the affinity histogram.
    Percentile,
    /// Log-scaled median weight.
    MedianLogCount,
}

/// Errors surfaced while executing CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// The edge list could not be opened.
    #[error("failed to open `{path}`: {source}")]
    Io {
        /// Path that triggered the failure.
        path: PathBuf,
        /// Underlying operating system error.
        #[source]
        source: io::Error,
    },
    /// The edge list was malformed.
    #[error("failed to parse `{path}`: {source}")]
    EdgeList {
        /// Path of the edge list.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: EdgeListError,
    },
    /// Strategy parameters were rejected.
    #[error(transparent)]
    Strategy(#[from] EdgeError),
    /// The graph could not be built.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// The merging run failed.
    #[error(transparent)]
    Merge(#[from] MergeError),
}

impl CliError {
    /// Stable code of the library error behind this failure, if any.
    #[must_use]
    pub const fn code(&self) -> Option<&'static str> {
        match self {
            Self::Io { .. } | Self::EdgeList { .. } => None,
            Self::Strategy(err) => Some(err.code().as_str()),
            Self::Graph(err) => Some(err.code().as_str()),
            Self::Merge(err) => Some(err.code().as_str()),
        }
    }
}

/// Summarises the outcome of executing a CLI command.
#[derive(Debug, Clone)]
pub struct ExecutionSummary {
    /// Number of nodes in the input graph.
    pub nodes: usize,
    /// Number of distinct edges after folding parallel observations.
    pub edges: usize,
    /// Number of regions left when the run stopped.
    pub regions: usize,
    /// Merge log and bookkeeping returned by the engine.
    pub outcome: MergeOutcome,
}

/// Executes the CLI command represented by `cli`.
///
/// # Errors
/// Returns [`CliError`] when reading the input or merging fails.
///
/// # Examples
/// ```
/// # use std::error::Error;
/// # use clap::Parser;
/// # use regionmerge_cli::cli::{Cli, run_cli};
/// # use tempfile::NamedTempFile;
/// #
/// # fn main() -> Result<(), Box<dyn Error>> {
/// let file = NamedTempFile::new()?;
/// std::fs::write(file.path(), "0 1 0.9\n1 2 0.2\n")?;
/// let path = file.path().to_string_lossy().into_owned();
/// let cli = Cli::try_parse_from(["regionmerge", "merge", path.as_str(), "--threshold", "0.5"])?;
/// let summary = run_cli(cli)?;
/// assert_eq!(summary.outcome.log().len(), 1);
/// # Ok(())
/// # }
/// ```
#[instrument(
    name = "cli.run",
    err,
    skip(cli),
    fields(command = field::Empty),
)]
pub fn run_cli(cli: Cli) -> Result<ExecutionSummary, CliError> {
    match cli.command {
        Command::Merge(merge) => {
            Span::current().record("command", field::display("merge"));
            run_merge(&merge)
        }
    }
}

#[instrument(
    name = "cli.merge",
    err,
    skip(command),
    fields(path = %command.path.display(), merger = ?command.merger, weight = ?command.weight),
)]
pub(super) fn run_merge(command: &MergeCommand) -> Result<ExecutionSummary, CliError> {
    let strategies = Strategies::from_command(command)?;
    let raw = load_edges(&command.path)?;
    let mut graph = UndirectedGraph::from_raw_edges(raw, &strategies.creator, &strategies.merger)?;
    let nodes = graph.node_count();
    let edges = graph.live_edge_count();

    let mut builder = RegionMergingBuilder::new()
        .with_threshold(command.threshold)
        .with_minimum_multiplicity(command.minimum_multiplicity)
        .with_non_contracting_edges(command.non_contracting.iter().copied());
    if let Some(cap) = command.max_passes {
        builder = builder.with_max_passes(cap);
    }
    let merging = builder.build()?;

    let mut sizes = graph.unit_region_sizes();
    let outcome = merging.run(
        &mut graph,
        &strategies.merger,
        &strategies.weight,
        &mut sizes,
        |_, _, _, _| {},
    )?;

    let regions = graph.node_count();
    info!(
        nodes,
        edges,
        regions,
        merges = outcome.log().len(),
        passes = outcome.passes(),
        "merge completed"
    );
    Ok(ExecutionSummary {
        nodes,
        edges,
        regions,
        outcome,
    })
}

/// Strategy values resolved from the command-line flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct Strategies {
    pub(super) creator: CreatorStrategy,
    pub(super) merger: MergeStrategy,
    pub(super) weight: WeightStrategy,
}

impl Strategies {
    /// Resolves the strategies named by `command`.
    ///
    /// The creator follows the merger: a histogram merger needs histogram
    /// payloads. A histogram weight paired with a scalar merger is left for
    /// the engine to reject.
    pub(super) fn from_command(command: &MergeCommand) -> Result<Self, CliError> {
        let bins = || HistogramBins::new(command.bins, command.min, command.max);
        let (creator, merger) = match command.merger {
            MergerKind::Max => (CreatorStrategy::NoPayload, MergeStrategy::MaxAffinity),
            MergerKind::Min => (CreatorStrategy::NoPayload, MergeStrategy::MinAffinity),
            MergerKind::Avg => (CreatorStrategy::NoPayload, MergeStrategy::AvgAffinity),
            MergerKind::MedianHistogram => (
                CreatorStrategy::AffinityHistogram(bins()?),
                MergeStrategy::MedianHistogram(command.bins),
            ),
        };
        let weight = match command.weight {
            WeightKind::OneMinusAffinity => WeightStrategy::OneMinusAffinity,
            WeightKind::Funky => WeightStrategy::Funky,
            WeightKind::FunkySquared => WeightStrategy::FunkySquared,
            WeightKind::MedianHistogram => WeightStrategy::MedianHistogram(bins()?),
            WeightKind::Percentile => WeightStrategy::percentile(bins()?, command.percentile)?,
            WeightKind::MedianLogCount => WeightStrategy::MedianLogCount(bins()?),
        };
        Ok(Self {
            creator,
            merger,
            weight,
        })
    }
}

#[instrument(name = "cli.load_edges", err, fields(edges = field::Empty))]
pub(super) fn load_edges(path: &Path) -> Result<Vec<RawEdge>, CliError> {
    let file = File::open(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let edges = read_edge_list(BufReader::new(file)).map_err(|source| CliError::EdgeList {
        path: path.to_path_buf(),
        source,
    })?;
    Span::current().record("edges", edges.len());
    Ok(edges)
}

/// Renders `summary` to `writer`: one `edge\tweight\tregion1\tregion2` line
/// per merge, then a summary line.
///
/// # Errors
/// Returns [`io::Error`] if writing to the supplied writer fails.
pub fn render_summary(summary: &ExecutionSummary, mut writer: impl Write) -> io::Result<()> {
    for record in summary.outcome.log() {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            record.edge, record.weight, record.region1, record.region2
        )?;
    }
    writeln!(
        writer,
        "# nodes: {} edges: {} merges: {} regions: {} passes: {} converged: {}",
        summary.nodes,
        summary.edges,
        summary.outcome.log().len(),
        summary.regions,
        summary.outcome.passes(),
        summary.outcome.converged(),
    )
}
