//! Strategies that build a new edge's payload from one raw observation.

use crate::graph::RawEdge;

use super::histogram::HistogramBins;

/// Fills the payload of a freshly appended edge.
pub trait EdgeCreator {
    /// Number of payload slots written per edge.
    fn payload_len(&self) -> usize;

    /// Writes the payload for `observation` into the zero-initialised
    /// `payload`.
    fn fill_payload(&self, observation: &RawEdge, payload: &mut [f64]);
}

impl<T: EdgeCreator + ?Sized> EdgeCreator for &T {
    fn payload_len(&self) -> usize {
        (**self).payload_len()
    }

    fn fill_payload(&self, observation: &RawEdge, payload: &mut [f64]) {
        (**self).fill_payload(observation, payload);
    }
}

/// Built-in edge creators.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CreatorStrategy {
    /// Edges carry no payload.
    NoPayload,
    /// Single-observation affinity histogram: `count = 1` and a `1` in the
    /// bin containing the affinity.
    AffinityHistogram(HistogramBins),
}

impl EdgeCreator for CreatorStrategy {
    fn payload_len(&self) -> usize {
        match self {
            Self::NoPayload => 0,
            Self::AffinityHistogram(bins) => bins.payload_len(),
        }
    }

    fn fill_payload(&self, observation: &RawEdge, payload: &mut [f64]) {
        match self {
            Self::NoPayload => {}
            Self::AffinityHistogram(bins) => {
                let bin = bins.bin_of(observation.affinity);
                if let Some(count) = payload.first_mut() {
                    *count = 1.0;
                }
                if let Some(slot) = payload.get_mut(bin + 1) {
                    *slot = 1.0;
                }
            }
        }
    }
}
