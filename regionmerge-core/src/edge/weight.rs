//! Strategies that score an edge; smaller weights contract first.

use tracing::trace;

use crate::error::EdgeError;

use super::histogram::{
    HistogramBins, count_of, median_from_histogram, percentile_from_histogram,
};
use super::EdgeRef;

/// Derives a scalar weight from an edge and the sizes of the regions its
/// endpoints currently belong to.
///
/// Closures with the matching signature implement the trait:
///
/// ```
/// use regionmerge_core::{EdgeRecord, EdgeStore, EdgeWeight, EdgeRef};
///
/// let mut store = EdgeStore::new(0);
/// let index = store.append(EdgeRecord::new(0.25, 0, 1, 1), &[])?;
/// let weight = |edge: EdgeRef<'_>, _: u64, _: u64| 1.0 - edge.affinity();
/// let edge = store.get(index).expect("edge exists");
/// assert!((weight.weight(edge, 1, 1) - 0.75).abs() < 1e-12);
/// # Ok::<(), regionmerge_core::EdgeError>(())
/// ```
pub trait EdgeWeight {
    /// Payload length this weight reads, or `None` when it ignores the
    /// payload.
    fn payload_len(&self) -> Option<usize> {
        None
    }

    /// Computes the weight of `edge` joining regions of `size1` and `size2`
    /// original nodes.
    fn weight(&self, edge: EdgeRef<'_>, size1: u64, size2: u64) -> f64;
}

impl<F> EdgeWeight for F
where
    F: Fn(EdgeRef<'_>, u64, u64) -> f64,
{
    fn weight(&self, edge: EdgeRef<'_>, size1: u64, size2: u64) -> f64 {
        self(edge, size1, size2)
    }
}

/// Built-in edge weights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WeightStrategy {
    /// `1 - affinity`.
    OneMinusAffinity,
    /// `min(size1, size2) * (1 - affinity)`.
    Funky,
    /// `min(size1, size2) * (1 - affinity)^2`.
    FunkySquared,
    /// `1 - median`, the median read from a histogram payload.
    MedianHistogram(HistogramBins),
    /// `1 - p-th percentile`, read from a histogram payload.
    PercentileHistogram {
        /// Histogram layout of the payload.
        bins: HistogramBins,
        /// Target cumulative fraction in `[0, 1]`.
        percentile: f64,
    },
    /// `log10(1 + median_weight * max(size1, size2))`.
    MedianLogCount(HistogramBins),
}

impl WeightStrategy {
    /// Builds a [`Self::PercentileHistogram`] after validating `percentile`.
    ///
    /// # Errors
    /// Returns [`EdgeError::InvalidPercentile`] when `percentile` is outside
    /// `[0, 1]` or NaN.
    pub fn percentile(bins: HistogramBins, percentile: f64) -> Result<Self, EdgeError> {
        if !(0.0..=1.0).contains(&percentile) {
            return Err(EdgeError::InvalidPercentile { percentile });
        }
        Ok(Self::PercentileHistogram { bins, percentile })
    }

    fn histogram_weight(bins: &HistogramBins, edge: EdgeRef<'_>, percentile: Option<f64>) -> f64 {
        let Some((&count, histogram)) = edge.payload().split_first() else {
            return f64::INFINITY;
        };
        let total = count_of(count);
        let estimate = match percentile {
            None => median_from_histogram(histogram, total, bins.min(), bins.bin_width()),
            Some(p) => {
                percentile_from_histogram(histogram, total, bins.min(), bins.bin_width(), p)
            }
        };
        let Some(affinity) = estimate else {
            return f64::INFINITY;
        };
        trace!(edge = edge.index(), total, affinity, "histogram weight");
        1.0 - affinity
    }
}

impl EdgeWeight for WeightStrategy {
    fn payload_len(&self) -> Option<usize> {
        match self {
            Self::OneMinusAffinity | Self::Funky | Self::FunkySquared => None,
            Self::MedianHistogram(bins)
            | Self::PercentileHistogram { bins, .. }
            | Self::MedianLogCount(bins) => Some(bins.payload_len()),
        }
    }

    fn weight(&self, edge: EdgeRef<'_>, size1: u64, size2: u64) -> f64 {
        match self {
            Self::OneMinusAffinity => 1.0 - edge.affinity(),
            Self::Funky => size1.min(size2) as f64 * (1.0 - edge.affinity()),
            Self::FunkySquared => {
                let diff = 1.0 - edge.affinity();
                size1.min(size2) as f64 * diff * diff
            }
            Self::MedianHistogram(bins) => Self::histogram_weight(bins, edge, None),
            Self::PercentileHistogram { bins, percentile } => {
                Self::histogram_weight(bins, edge, Some(*percentile))
            }
            Self::MedianLogCount(bins) => {
                let median = Self::histogram_weight(bins, edge, None);
                (1.0 + median * size1.max(size2) as f64).log10()
            }
        }
    }
}
