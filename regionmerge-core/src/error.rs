//! Error types for the region merging core library.
//!
//! Each layer owns one error enum: [`EdgeError`] for the edge store and the
//! edge strategies, [`GraphError`] for graph construction and contraction, and
//! [`MergeError`] for the merging engine. Outer errors wrap inner ones so a
//! failed histogram merge deep inside a contraction still surfaces with its
//! original code.

use std::fmt;

use thiserror::Error;

use crate::edge::{EdgeIndex, NodeId};

macro_rules! define_error_codes {
    (
        $(#[$enum_meta:meta])*
        enum $CodeTy:ident for $ErrTy:ident {
            $(
                $(#[$variant_meta:meta])*
                $CodeVariant:ident => $ErrVariant:ident $( { $($pattern:tt)* } )? $( ( $($tuple:tt)* ) )? => $code:expr
            ),+ $(,)?
        }
    ) => {
        $(#[$enum_meta])*
        #[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
        #[non_exhaustive]
        pub enum $CodeTy {
            $(
                $(#[$variant_meta])*
                $CodeVariant,
            )+
        }

        impl $CodeTy {
            /// Return the stable machine-readable representation of this error code.
            #[must_use]
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$CodeVariant => $code,)+
                }
            }
        }

        impl fmt::Display for $CodeTy {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl $ErrTy {
            #[doc = concat!(
                "Retrieve the stable [`",
                stringify!($CodeTy),
                "`] for this error."
            )]
            #[must_use]
            pub const fn code(&self) -> $CodeTy {
                match self {
                    $(Self::$ErrVariant $( { $($pattern)* } )? $( ( $($tuple)* ) )? => $CodeTy::$CodeVariant,)+
                }
            }
        }
    };
}

/// An error produced by the edge store or by an edge strategy.
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum EdgeError {
    /// An edge index did not address a record in the store.
    #[error("edge index {index} is out of bounds for a store of {len} edges")]
    IndexOutOfBounds {
        /// The requested edge index.
        index: EdgeIndex,
        /// Number of records held by the store.
        len: usize,
    },
    /// A payload did not match the store's per-edge payload length.
    #[error("edge payload has length {got} but the store expects {expected}")]
    PayloadLength {
        /// Payload length configured on the store.
        expected: usize,
        /// Payload length that was supplied.
        got: usize,
    },
    /// A record was asked to absorb itself.
    #[error("edge {index} cannot be merged into itself")]
    SelfMerge {
        /// Index of the record named on both sides of the merge.
        index: EdgeIndex,
    },
    /// A histogram payload entered a merge with a zero count slot.
    #[error("histogram merge of edge {absorbed} into edge {survivor} found an empty count slot")]
    EmptyHistogram {
        /// Record whose payload was being absorbed.
        absorbed: EdgeIndex,
        /// Record receiving the combined payload.
        survivor: EdgeIndex,
    },
    /// A histogram value range was empty or not finite.
    #[error("histogram range [{min}, {max}) is invalid")]
    InvalidHistogramRange {
        /// Lower bound of the rejected range.
        min: f64,
        /// Upper bound of the rejected range.
        max: f64,
    },
    /// A percentile fell outside `[0, 1]`.
    #[error("percentile {percentile} must lie within [0, 1]")]
    InvalidPercentile {
        /// The rejected percentile.
        percentile: f64,
    },
}

define_error_codes! {
    /// Stable codes describing [`EdgeError`] variants.
    enum EdgeErrorCode for EdgeError {
        /// An edge index did not address a record in the store.
        IndexOutOfBounds => IndexOutOfBounds { .. } => "EDGE_INDEX_OUT_OF_BOUNDS",
        /// A payload did not match the store's per-edge payload length.
        PayloadLength => PayloadLength { .. } => "EDGE_PAYLOAD_LENGTH",
        /// A record was asked to absorb itself.
        SelfMerge => SelfMerge { .. } => "EDGE_SELF_MERGE",
        /// A histogram payload entered a merge with a zero count slot.
        EmptyHistogram => EmptyHistogram { .. } => "EDGE_EMPTY_HISTOGRAM",
        /// A histogram value range was empty or not finite.
        InvalidHistogramRange => InvalidHistogramRange { .. } => "EDGE_INVALID_HISTOGRAM_RANGE",
        /// A percentile fell outside `[0, 1]`.
        InvalidPercentile => InvalidPercentile { .. } => "EDGE_INVALID_PERCENTILE",
    }
}

/// An error produced while building or contracting an
/// [`crate::UndirectedGraph`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum GraphError {
    /// An input edge connected a node to itself.
    #[error("input edge connects node {node} to itself")]
    SelfLoop {
        /// The node named at both ends of the edge.
        node: NodeId,
    },
    /// An input edge carried a NaN or infinite affinity.
    #[error("input edge ({from}, {to}) has non-finite affinity")]
    NonFiniteAffinity {
        /// First endpoint of the offending edge.
        from: NodeId,
        /// Second endpoint of the offending edge.
        to: NodeId,
    },
    /// The edge creator and the edge merger disagree on payload length.
    #[error("edge creator writes {creator} payload slots but the merger expects {merger}")]
    PayloadLengthMismatch {
        /// Payload length produced by the creator (or held by the store).
        creator: usize,
        /// Payload length consumed by the merger.
        merger: usize,
    },
    /// Contraction was requested on an edge that is already obsolete.
    #[error("edge {index} is obsolete and cannot be contracted")]
    ObsoleteEdge {
        /// Index of the obsolete edge.
        index: EdgeIndex,
    },
    /// The surviving node of a contraction was not an endpoint of the edge.
    #[error("node {node} is not an endpoint of edge {index} ({from}, {to})")]
    NotAnEndpoint {
        /// Index of the edge being contracted.
        index: EdgeIndex,
        /// Node requested as the survivor.
        node: NodeId,
        /// First endpoint of the edge.
        from: NodeId,
        /// Second endpoint of the edge.
        to: NodeId,
    },
    /// An edge store operation failed.
    #[error(transparent)]
    Edge(#[from] EdgeError),
}

define_error_codes! {
    /// Stable codes describing [`GraphError`] variants.
    enum GraphErrorCode for GraphError {
        /// An input edge connected a node to itself.
        SelfLoop => SelfLoop { .. } => "GRAPH_SELF_LOOP",
        /// An input edge carried a NaN or infinite affinity.
        NonFiniteAffinity => NonFiniteAffinity { .. } => "GRAPH_NON_FINITE_AFFINITY",
        /// The edge creator and the edge merger disagree on payload length.
        PayloadLengthMismatch => PayloadLengthMismatch { .. } => "GRAPH_PAYLOAD_LENGTH_MISMATCH",
        /// Contraction was requested on an edge that is already obsolete.
        ObsoleteEdge => ObsoleteEdge { .. } => "GRAPH_OBSOLETE_EDGE",
        /// The surviving node of a contraction was not an endpoint of the edge.
        NotAnEndpoint => NotAnEndpoint { .. } => "GRAPH_NOT_AN_ENDPOINT",
        /// An edge store operation failed.
        EdgeFailure => Edge(..) => "GRAPH_EDGE_FAILURE",
    }
}

impl GraphError {
    /// Retrieve the inner [`EdgeErrorCode`] when the error originated in the
    /// edge store or an edge strategy.
    #[must_use]
    pub const fn edge_code(&self) -> Option<EdgeErrorCode> {
        match self {
            Self::Edge(error) => Some(error.code()),
            _ => None,
        }
    }
}

/// Error type produced when configuring or running [`crate::RegionMerging`].
#[non_exhaustive]
#[derive(Clone, Debug, Error, PartialEq)]
pub enum MergeError {
    /// The weight threshold was NaN.
    #[error("merge threshold must not be NaN")]
    InvalidThreshold,
    /// The weight strategy expects a different payload than the graph holds.
    #[error("edge weight reads {weight} payload slots but the graph stores {store}")]
    PayloadLengthMismatch {
        /// Payload length read by the weight strategy.
        weight: usize,
        /// Payload length held by the graph's edge store.
        store: usize,
    },
    /// A graph operation failed while merging.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

define_error_codes! {
    /// Stable codes describing [`MergeError`] variants.
    enum MergeErrorCode for MergeError {
        /// The weight threshold was NaN.
        InvalidThreshold => InvalidThreshold => "MERGE_INVALID_THRESHOLD",
        /// The weight strategy expects a different payload than the graph holds.
        PayloadLengthMismatch => PayloadLengthMismatch { .. } => "MERGE_PAYLOAD_LENGTH_MISMATCH",
        /// A graph operation failed while merging.
        GraphFailure => Graph(..) => "MERGE_GRAPH_FAILURE",
    }
}

impl MergeError {
    /// Retrieve the inner [`GraphErrorCode`] when the error originated in the
    /// graph.
    #[must_use]
    pub const fn graph_code(&self) -> Option<GraphErrorCode> {
        match self {
            Self::Graph(error) => Some(error.code()),
            _ => None,
        }
    }
}

impl From<EdgeError> for MergeError {
    fn from(error: EdgeError) -> Self {
        Self::Graph(GraphError::Edge(error))
    }
}

/// Convenient alias for results returned by the merging API.
pub type Result<T> = core::result::Result<T, MergeError>;
