//! Configuration surface for [`RegionMerging`].

use std::{collections::HashSet, num::NonZeroUsize};

use crate::{
    Result,
    edge::EdgeIndex,
    error::MergeError,
};

use super::RegionMerging;

/// Configures and constructs [`RegionMerging`] instances.
///
/// # Examples
/// ```
/// use std::num::NonZeroUsize;
/// use regionmerge_core::RegionMergingBuilder;
///
/// let merging = RegionMergingBuilder::new()
///     .with_threshold(0.5)
///     .with_minimum_multiplicity(2)
///     .with_non_contracting_edges([4, 7])
///     .with_max_passes(NonZeroUsize::new(10).expect("non-zero"))
///     .build()
///     .expect("configuration is valid");
/// assert_eq!(merging.threshold(), 0.5);
/// assert_eq!(merging.minimum_multiplicity(), 2);
/// assert!(merging.non_contracting_edges().contains(&7));
/// assert_eq!(merging.max_passes().map(NonZeroUsize::get), Some(10));
/// ```
#[derive(Debug, Clone)]
pub struct RegionMergingBuilder {
    threshold: f64,
    minimum_multiplicity: u64,
    non_contracting_edges: HashSet<EdgeIndex>,
    max_passes: Option<NonZeroUsize>,
}

impl Default for RegionMergingBuilder {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            minimum_multiplicity: 0,
            non_contracting_edges: HashSet::new(),
            max_passes: None,
        }
    }
}

impl RegionMergingBuilder {
    /// Creates a builder populated with default parameters: threshold `1.0`,
    /// no multiplicity gate, no protected edges and no pass cap.
    ///
    /// # Examples
    /// ```
    /// use regionmerge_core::RegionMergingBuilder;
    ///
    /// let builder = RegionMergingBuilder::new();
    /// assert_eq!(builder.threshold(), 1.0);
    /// assert_eq!(builder.minimum_multiplicity(), 0);
    /// ```
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Overrides the weight threshold. Edges heavier than the threshold never
    /// count as local minima.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Returns the configured weight threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Overrides the multiplicity gate. Edges with fewer observations are
    /// ignored entirely.
    #[must_use]
    pub fn with_minimum_multiplicity(mut self, minimum: u64) -> Self {
        self.minimum_multiplicity = minimum;
        self
    }

    /// Returns the configured multiplicity gate.
    #[must_use]
    pub fn minimum_multiplicity(&self) -> u64 {
        self.minimum_multiplicity
    }

    /// Adds edges that must never contract. Their neighbours are held back
    /// as well.
    #[must_use]
    pub fn with_non_contracting_edges<I>(mut self, edges: I) -> Self
    where
        I: IntoIterator<Item = EdgeIndex>,
    {
        self.non_contracting_edges.extend(edges);
        self
    }

    /// Returns the protected edges.
    #[must_use]
    pub fn non_contracting_edges(&self) -> &HashSet<EdgeIndex> {
        &self.non_contracting_edges
    }

    /// Caps the number of passes a run may take.
    #[must_use]
    pub fn with_max_passes(mut self, passes: NonZeroUsize) -> Self {
        self.max_passes = Some(passes);
        self
    }

    /// Returns the pass cap, if any.
    #[must_use]
    pub fn max_passes(&self) -> Option<NonZeroUsize> {
        self.max_passes
    }

    /// Validates the configuration and constructs a [`RegionMerging`].
    ///
    /// # Errors
    /// Returns [`MergeError::InvalidThreshold`] when the threshold is NaN.
    ///
    /// # Examples
    /// ```
    /// use regionmerge_core::{MergeErrorCode, RegionMergingBuilder};
    ///
    /// let err = RegionMergingBuilder::new()
    ///     .with_threshold(f64::NAN)
    ///     .build()
    ///     .expect_err("NaN threshold is rejected");
    /// assert_eq!(err.code(), MergeErrorCode::InvalidThreshold);
    /// ```
    pub fn build(self) -> Result<RegionMerging> {
        if self.threshold.is_nan() {
            return Err(MergeError::InvalidThreshold);
        }
        Ok(RegionMerging {
            threshold: self.threshold,
            minimum_multiplicity: self.minimum_multiplicity,
            non_contracting_edges: self.non_contracting_edges,
            max_passes: self.max_passes,
        })
    }
}
