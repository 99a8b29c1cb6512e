//! Fixed-range affinity histograms and the percentile estimates read from
//! them.
//!
//! A histogram payload is laid out as `[count, bin_0, ..., bin_{n-1}]`, every
//! slot holding a whole number. Percentiles are located by cumulative count
//! and linearly interpolated inside the bin that contains them.

use std::num::NonZeroUsize;

use crate::error::EdgeError;

/// Number of bins and value range shared by histogram creators, mergers and
/// weights.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HistogramBins {
    bins: NonZeroUsize,
    min: f64,
    max: f64,
}

impl HistogramBins {
    /// Creates a histogram layout covering `[min, max)` with `bins` equal-width
    /// bins.
    ///
    /// # Errors
    /// Returns [`EdgeError::InvalidHistogramRange`] when either bound is not
    /// finite or `min >= max`.
    ///
    /// # Examples
    /// ```
    /// use std::num::NonZeroUsize;
    /// use regionmerge_core::HistogramBins;
    ///
    /// let bins = HistogramBins::new(NonZeroUsize::new(10).expect("non-zero"), 0.0, 1.0)?;
    /// assert_eq!(bins.payload_len(), 11);
    /// assert!((bins.bin_width() - 0.1).abs() < 1e-12);
    /// # Ok::<(), regionmerge_core::EdgeError>(())
    /// ```
    pub fn new(bins: NonZeroUsize, min: f64, max: f64) -> Result<Self, EdgeError> {
        if !min.is_finite() || !max.is_finite() || min >= max {
            return Err(EdgeError::InvalidHistogramRange { min, max });
        }
        Ok(Self { bins, min, max })
    }

    /// Returns the number of bins.
    #[must_use]
    #[rustfmt::skip]
    pub const fn bins(&self) -> NonZeroUsize { self.bins }

    /// Returns the lower bound of the value range.
    #[must_use]
    #[rustfmt::skip]
    pub const fn min(&self) -> f64 { self.min }

    /// Returns the upper bound of the value range.
    #[must_use]
    #[rustfmt::skip]
    pub const fn max(&self) -> f64 { self.max }

    /// Returns the width of one bin.
    #[must_use]
    pub fn bin_width(&self) -> f64 {
        (self.max - self.min) / self.bins.get() as f64
    }

    /// Returns the payload length of a histogram edge: one count slot plus
    /// one slot per bin.
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        self.bins.get() + 1
    }

    /// Returns the bin `value` falls into, clamped to the valid bin range.
    #[must_use]
    pub fn bin_of(&self, value: f64) -> usize {
        let position = ((value - self.min) / self.bin_width()).floor();
        if position.is_nan() || position <= 0.0 {
            return 0;
        }
        let last = self.bins.get() - 1;
        if position >= last as f64 {
            last
        } else {
            position as usize
        }
    }
}

/// Estimates the median of a histogram.
///
/// Bins are visited in order until `2 * (visited + current) > total`; the
/// median then lies `(total / 2 - visited) / current` of the way through the
/// current bin. Returns `None` for an empty histogram.
///
/// # Examples
/// ```
/// use regionmerge_core::median_from_histogram;
///
/// // Four samples spread evenly over [0, 1) in four bins.
/// let median = median_from_histogram(&[1.0, 1.0, 1.0, 1.0], 4, 0.0, 0.25)
///     .expect("non-empty histogram");
/// assert!((median - 0.5).abs() < 1e-12);
/// ```
#[must_use]
pub fn median_from_histogram(bins: &[f64], total: u64, min: f64, bin_width: f64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let mut visited = 0u64;
    let mut full_bins = 0usize;
    let mut current = 0u64;
    for &raw in bins {
        current = count_of(raw);
        if visited.saturating_add(current).saturating_mul(2) > total {
            break;
        }
        full_bins += 1;
        visited = visited.saturating_add(current);
    }
    let lower = min + full_bins as f64 * bin_width;
    if current == 0 {
        return Some(lower);
    }
    let fraction = (0.5 * total as f64 - visited as f64) / current as f64;
    Some(lower + fraction * bin_width)
}

/// Estimates an arbitrary percentile of a histogram.
///
/// Identical to [`median_from_histogram`] except that bins are visited until
/// the cumulative count reaches `total * percentile`. Returns `None` for an
/// empty histogram.
#[must_use]
pub fn percentile_from_histogram(
    bins: &[f64],
    total: u64,
    min: f64,
    bin_width: f64,
    percentile: f64,
) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let target = total as f64 * percentile;
    let mut visited = 0u64;
    let mut full_bins = 0usize;
    let mut current = 0u64;
    for &raw in bins {
        current = count_of(raw);
        if visited.saturating_add(current) as f64 >= target {
            break;
        }
        full_bins += 1;
        visited = visited.saturating_add(current);
    }
    let lower = min + full_bins as f64 * bin_width;
    if current == 0 {
        return Some(lower);
    }
    let fraction = (target - visited as f64) / current as f64;
    Some(lower + fraction * bin_width)
}

/// Reads a payload slot as a whole count. Counts past `u64::MAX` saturate.
pub(crate) fn count_of(raw: f64) -> u64 {
    if raw.is_finite() && raw > 0.0 {
        raw.round() as u64
    } else {
        0
    }
}
