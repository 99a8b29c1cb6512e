//! Edge records, their backing store, and the pluggable edge strategies.
//!
//! Every edge of the graph lives in one [`EdgeStore`]: a contiguous table of
//! fixed-layout [`EdgeRecord`]s plus a parallel payload table with one
//! fixed-length slice per record. Records are addressed by [`EdgeIndex`] and
//! are never removed, so indices recorded in a merge log stay valid for the
//! lifetime of the store. Logically deleted records are flagged
//! [`EdgeStatus::OBSOLETE`] instead.
//!
//! The strategies that give edges meaning are traits:
//!
//! - [`EdgeCreator`] fills a new record's payload from a raw observation.
//! - [`EdgeMerger`] folds one record into another when two edges collapse.
//! - [`EdgeWeight`] scores a record; smaller weights contract first.
//!
//! Built-in variants are provided as [`CreatorStrategy`], [`MergeStrategy`]
//! and [`WeightStrategy`].

mod creator;
mod histogram;
mod merger;
mod store;
mod weight;

pub use self::{
    creator::{CreatorStrategy, EdgeCreator},
    histogram::{HistogramBins, median_from_histogram, percentile_from_histogram},
    merger::{EdgeMerger, MergeStrategy},
    store::{EdgeMut, EdgeRef, EdgeStore},
    weight::{EdgeWeight, WeightStrategy},
};

/// Identifier of a graph node (and, after merging, of a region).
pub type NodeId = u64;

/// Position of a record inside an [`EdgeStore`].
pub type EdgeIndex = usize;

/// Independent status flags carried by every edge record.
///
/// A record is *valid* while it is not [`Self::OBSOLETE`] and *active* while
/// it is not [`Self::STALE`].
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct EdgeStatus(u8);

impl EdgeStatus {
    /// The weight must be recomputed before the edge is evaluated again.
    pub const STALE: Self = Self(1 << 0);
    /// The edge was superseded by a contraction and must not be read as live.
    pub const OBSOLETE: Self = Self(1 << 1);

    /// Returns a status with no flags set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Returns `true` when every flag in `other` is set on `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Sets the flags in `other`.
    pub const fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the flags in `other`.
    pub const fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Returns the raw flag bits.
    #[must_use]
    #[rustfmt::skip]
    pub const fn bits(self) -> u8 { self.0 }
}

/// The fixed-layout part of an edge: everything except the strategy payload.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeRecord {
    weight: f64,
    affinity: f64,
    from: NodeId,
    to: NodeId,
    multiplicity: u64,
    status: EdgeStatus,
}

impl EdgeRecord {
    /// Creates a fresh record: stale, valid, and with an undefined (`NaN`)
    /// weight until the first reweighting.
    ///
    /// # Examples
    /// ```
    /// use regionmerge_core::EdgeRecord;
    ///
    /// let record = EdgeRecord::new(0.9, 2, 3, 1);
    /// assert!(record.is_stale());
    /// assert!(record.is_valid());
    /// assert!(record.weight().is_nan());
    /// ```
    #[must_use]
    pub const fn new(affinity: f64, from: NodeId, to: NodeId, multiplicity: u64) -> Self {
        Self {
            weight: f64::NAN,
            affinity,
            from,
            to,
            multiplicity,
            status: EdgeStatus::STALE,
        }
    }

    /// Overrides the initial weight.
    #[must_use]
    pub const fn with_weight(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Returns the current weight.
    #[must_use]
    #[rustfmt::skip]
    pub const fn weight(&self) -> f64 { self.weight }

    /// Returns the affinity.
    #[must_use]
    #[rustfmt::skip]
    pub const fn affinity(&self) -> f64 { self.affinity }

    /// Returns the first endpoint.
    #[must_use]
    #[rustfmt::skip]
    pub const fn from(&self) -> NodeId { self.from }

    /// Returns the second endpoint.
    #[must_use]
    #[rustfmt::skip]
    pub const fn to(&self) -> NodeId { self.to }

    /// Returns the accumulated observation count.
    #[must_use]
    #[rustfmt::skip]
    pub const fn multiplicity(&self) -> u64 { self.multiplicity }

    /// Returns the status flags.
    #[must_use]
    #[rustfmt::skip]
    pub const fn status(&self) -> EdgeStatus { self.status }

    /// Returns `true` when the weight must be recomputed.
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        self.status.contains(EdgeStatus::STALE)
    }

    /// Returns `true` when the weight is current.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.is_stale()
    }

    /// Returns `true` when the edge has been logically deleted.
    #[must_use]
    pub const fn is_obsolete(&self) -> bool {
        self.status.contains(EdgeStatus::OBSOLETE)
    }

    /// Returns `true` when the edge is live.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        !self.is_obsolete()
    }

    /// Returns the endpoint opposite `node`, if `node` is an endpoint.
    #[must_use]
    pub const fn opposite(&self, node: NodeId) -> Option<NodeId> {
        if node == self.from {
            Some(self.to)
        } else if node == self.to {
            Some(self.from)
        } else {
            None
        }
    }
}
