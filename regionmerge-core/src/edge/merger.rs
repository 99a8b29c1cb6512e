//! Strategies that fold one edge record into another.

use std::num::NonZeroUsize;

use crate::error::EdgeError;

use super::histogram::count_of;
use super::{EdgeMut, EdgeRef};

/// Combines the data of two edge records when they collapse into one.
///
/// `source` is the record being absorbed and stays untouched; `target`
/// receives the combined affinity, multiplicity and payload.
pub trait EdgeMerger {
    /// Number of payload slots this merger reads and writes.
    fn payload_len(&self) -> usize {
        0
    }

    /// Reports whether [`Self::merge`] would accept the pair, without
    /// writing anything.
    ///
    /// # Errors
    /// Returns the error `merge` would raise for the same pair.
    fn check(&self, _source: EdgeRef<'_>, _target: EdgeRef<'_>) -> Result<(), EdgeError> {
        Ok(())
    }

    /// Folds `source` into `target`.
    ///
    /// # Errors
    /// Implementations return [`EdgeError`] when either payload is corrupt.
    fn merge(&self, source: EdgeRef<'_>, target: EdgeMut<'_>) -> Result<(), EdgeError>;
}

impl<T: EdgeMerger + ?Sized> EdgeMerger for &T {
    fn payload_len(&self) -> usize {
        (**self).payload_len()
    }

    fn check(&self, source: EdgeRef<'_>, target: EdgeRef<'_>) -> Result<(), EdgeError> {
        (**self).check(source, target)
    }

    fn merge(&self, source: EdgeRef<'_>, target: EdgeMut<'_>) -> Result<(), EdgeError> {
        (**self).merge(source, target)
    }
}

/// Built-in edge mergers.
///
/// # Examples
/// ```
/// use regionmerge_core::{EdgeRecord, EdgeStore, MergeStrategy};
///
/// let mut store = EdgeStore::new(0);
/// let a = store.append(EdgeRecord::new(0.2, 0, 1, 1), &[])?;
/// let b = store.append(EdgeRecord::new(0.8, 0, 1, 3), &[])?;
/// store.merge(a, b, &MergeStrategy::AvgAffinity)?;
/// let merged = store.get(b).expect("edge exists");
/// assert_eq!(merged.multiplicity(), 4);
/// assert!((merged.affinity() - 0.65).abs() < 1e-12);
/// # Ok::<(), regionmerge_core::EdgeError>(())
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeStrategy {
    /// Keep the larger affinity.
    MaxAffinity,
    /// Keep the smaller affinity.
    MinAffinity,
    /// Multiplicity-weighted mean of the affinities.
    AvgAffinity,
    /// Element-wise sum of `[count, bins...]` histogram payloads with the
    /// given number of bins.
    MedianHistogram(NonZeroUsize),
}

impl EdgeMerger for MergeStrategy {
    fn payload_len(&self) -> usize {
        match self {
            Self::MedianHistogram(bins) => bins.get() + 1,
            Self::MaxAffinity | Self::MinAffinity | Self::AvgAffinity => 0,
        }
    }

    fn check(&self, source: EdgeRef<'_>, target: EdgeRef<'_>) -> Result<(), EdgeError> {
        match self {
            Self::MedianHistogram(_) => check_histograms(source, target),
            Self::MaxAffinity | Self::MinAffinity | Self::AvgAffinity => Ok(()),
        }
    }

    fn merge(&self, source: EdgeRef<'_>, mut target: EdgeMut<'_>) -> Result<(), EdgeError> {
        let multiplicity = source.multiplicity().saturating_add(target.multiplicity());
        match self {
            Self::MaxAffinity => {
                target.set_affinity(source.affinity().max(target.affinity()));
            }
            Self::MinAffinity => {
                target.set_affinity(source.affinity().min(target.affinity()));
            }
            Self::AvgAffinity => {
                let affinity = if multiplicity == 0 {
                    0.5 * (source.affinity() + target.affinity())
                } else {
                    (source.multiplicity() as f64 * source.affinity()
                        + target.multiplicity() as f64 * target.affinity())
                        / multiplicity as f64
                };
                target.set_affinity(affinity);
            }
            Self::MedianHistogram(_) => merge_histograms(source, &mut target)?,
        }
        target.set_multiplicity(multiplicity);
        Ok(())
    }
}

fn check_histograms(source: EdgeRef<'_>, target: EdgeRef<'_>) -> Result<(), EdgeError> {
    let empty = |payload: &[f64]| payload.first().is_none_or(|&count| count_of(count) == 0);
    if empty(source.payload()) || empty(target.payload()) {
        return Err(EdgeError::EmptyHistogram {
            absorbed: source.index(),
            survivor: target.index(),
        });
    }
    Ok(())
}

fn merge_histograms(source: EdgeRef<'_>, target: &mut EdgeMut<'_>) -> Result<(), EdgeError> {
    check_histograms(source, target.view())?;
    for (slot, &absorbed) in target.payload_mut().iter_mut().zip(source.payload()) {
        *slot = count_of(*slot).saturating_add(count_of(absorbed)) as f64;
    }
    Ok(())
}
