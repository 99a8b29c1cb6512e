//! Contiguous edge table and the borrowed views used to read and write it.
//!
//! Views are plain borrows of the store, so a view cannot outlive a call that
//! appends to or otherwise restructures the store.

use crate::error::EdgeError;

use super::{EdgeIndex, EdgeMerger, EdgeRecord, EdgeStatus, NodeId};

/// Growable table of edge records with a fixed-length payload per record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EdgeStore {
    records: Vec<EdgeRecord>,
    payloads: Vec<f64>,
    payload_len: usize,
}

impl EdgeStore {
    /// Creates an empty store whose records each carry `payload_len` payload
    /// slots.
    ///
    /// # Examples
    /// ```
    /// use regionmerge_core::EdgeStore;
    ///
    /// let store = EdgeStore::new(4);
    /// assert!(store.is_empty());
    /// assert_eq!(store.payload_len(), 4);
    /// ```
    #[must_use]
    pub const fn new(payload_len: usize) -> Self {
        Self {
            records: Vec::new(),
            payloads: Vec::new(),
            payload_len,
        }
    }

    /// Creates an empty store with room for `edges` records.
    #[must_use]
    pub fn with_capacity(payload_len: usize, edges: usize) -> Self {
        Self {
            records: Vec::with_capacity(edges),
            payloads: Vec::with_capacity(edges.saturating_mul(payload_len)),
            payload_len,
        }
    }

    /// Returns the number of records, obsolete ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Returns the per-record payload length.
    #[must_use]
    #[rustfmt::skip]
    pub const fn payload_len(&self) -> usize { self.payload_len }

    /// Appends `record` with a copy of `payload` and returns its index.
    ///
    /// # Errors
    /// Returns [`EdgeError::PayloadLength`] when `payload` does not match
    /// [`Self::payload_len`].
    ///
    /// # Examples
    /// ```
    /// use regionmerge_core::{EdgeRecord, EdgeStore};
    ///
    /// let mut store = EdgeStore::new(0);
    /// let index = store.append(EdgeRecord::new(0.5, 0, 1, 1), &[])?;
    /// assert_eq!(index, 0);
    /// assert_eq!(store.len(), 1);
    /// # Ok::<(), regionmerge_core::EdgeError>(())
    /// ```
    pub fn append(&mut self, record: EdgeRecord, payload: &[f64]) -> Result<EdgeIndex, EdgeError> {
        if payload.len() != self.payload_len {
            return Err(EdgeError::PayloadLength {
                expected: self.payload_len,
                got: payload.len(),
            });
        }
        Ok(self.append_with(record, |slots| slots.copy_from_slice(payload)))
    }

    /// Appends `record` and lets `fill` write its zero-initialised payload.
    pub fn append_with<F>(&mut self, record: EdgeRecord, fill: F) -> EdgeIndex
    where
        F: FnOnce(&mut [f64]),
    {
        let index = self.records.len();
        self.records.push(record);
        let start = self.payloads.len();
        self.payloads.resize(start + self.payload_len, 0.0);
        fill(&mut self.payloads[start..]);
        index
    }

    /// Binds a read-only view to the record at `index`.
    #[must_use]
    pub fn get(&self, index: EdgeIndex) -> Option<EdgeRef<'_>> {
        let record = self.records.get(index)?;
        let payload = self.payloads.get(self.payload_range(index))?;
        Some(EdgeRef {
            index,
            record,
            payload,
        })
    }

    /// Binds a writable view to the record at `index`.
    #[must_use]
    pub fn get_mut(&mut self, index: EdgeIndex) -> Option<EdgeMut<'_>> {
        let range = self.payload_range(index);
        let record = self.records.get_mut(index)?;
        let payload = self.payloads.get_mut(range)?;
        Some(EdgeMut {
            index,
            record,
            payload,
        })
    }

    /// Like [`Self::get`] but reports a missing record as an error.
    ///
    /// # Errors
    /// Returns [`EdgeError::IndexOutOfBounds`] when `index` is past the end.
    pub fn try_get(&self, index: EdgeIndex) -> Result<EdgeRef<'_>, EdgeError> {
        let len = self.len();
        self.get(index)
            .ok_or(EdgeError::IndexOutOfBounds { index, len })
    }

    /// Like [`Self::get_mut`] but reports a missing record as an error.
    ///
    /// # Errors
    /// Returns [`EdgeError::IndexOutOfBounds`] when `index` is past the end.
    pub fn try_get_mut(&mut self, index: EdgeIndex) -> Result<EdgeMut<'_>, EdgeError> {
        let len = self.len();
        self.get_mut(index)
            .ok_or(EdgeError::IndexOutOfBounds { index, len })
    }

    /// Iterates over every record in index order, obsolete ones included.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = EdgeRef<'_>> + '_ {
        let len = self.payload_len;
        self.records.iter().enumerate().map(move |(index, record)| {
            let start = index * len;
            EdgeRef {
                index,
                record,
                payload: &self.payloads[start..start + len],
            }
        })
    }

    /// Folds the record at `source` into the record at `target` using
    /// `merger`. `source` is left untouched.
    ///
    /// # Errors
    /// Returns [`EdgeError::IndexOutOfBounds`] for unknown indices,
    /// [`EdgeError::SelfMerge`] when both indices coincide, and whatever the
    /// merger reports.
    pub fn merge<M>(
        &mut self,
        source: EdgeIndex,
        target: EdgeIndex,
        merger: &M,
    ) -> Result<(), EdgeError>
    where
        M: EdgeMerger + ?Sized,
    {
        let (source, target) = self.split_pair(source, target)?;
        merger.merge(source, target)
    }

    /// Splits the table into a shared view of `shared` and a writable view of
    /// `exclusive`.
    fn split_pair(
        &mut self,
        shared: EdgeIndex,
        exclusive: EdgeIndex,
    ) -> Result<(EdgeRef<'_>, EdgeMut<'_>), EdgeError> {
        let len = self.len();
        for index in [shared, exclusive] {
            if index >= len {
                return Err(EdgeError::IndexOutOfBounds { index, len });
            }
        }
        if shared == exclusive {
            return Err(EdgeError::SelfMerge { index: shared });
        }

        let stride = self.payload_len;
        let (shared_record, exclusive_record) = split_two(&mut self.records, shared, exclusive);
        let (shared_payload, exclusive_payload) =
            split_two_payloads(&mut self.payloads, stride, shared, exclusive);

        Ok((
            EdgeRef {
                index: shared,
                record: shared_record,
                payload: shared_payload,
            },
            EdgeMut {
                index: exclusive,
                record: exclusive_record,
                payload: exclusive_payload,
            },
        ))
    }

    fn payload_range(&self, index: EdgeIndex) -> std::ops::Range<usize> {
        let start = index.saturating_mul(self.payload_len);
        start..start.saturating_add(self.payload_len)
    }
}

fn split_two<T>(items: &mut [T], first: usize, second: usize) -> (&mut T, &mut T) {
    debug_assert_ne!(first, second, "split indices must differ");
    if first < second {
        let (head, tail) = items.split_at_mut(second);
        (&mut head[first], &mut tail[0])
    } else {
        let (head, tail) = items.split_at_mut(first);
        (&mut tail[0], &mut head[second])
    }
}

fn split_two_payloads(
    payloads: &mut [f64],
    stride: usize,
    first: usize,
    second: usize,
) -> (&mut [f64], &mut [f64]) {
    if first < second {
        let (head, tail) = payloads.split_at_mut(second * stride);
        let start = first * stride;
        (&mut head[start..start + stride], &mut tail[..stride])
    } else {
        let (head, tail) = payloads.split_at_mut(first * stride);
        let start = second * stride;
        (&mut tail[..stride], &mut head[start..start + stride])
    }
}

/// Read-only view of one edge record and its payload.
#[derive(Clone, Copy, Debug)]
pub struct EdgeRef<'a> {
    index: EdgeIndex,
    record: &'a EdgeRecord,
    payload: &'a [f64],
}

impl<'a> EdgeRef<'a> {
    /// Returns the record's index in its store.
    #[must_use]
    #[rustfmt::skip]
    pub const fn index(&self) -> EdgeIndex { self.index }

    /// Returns the fixed-layout record.
    #[must_use]
    #[rustfmt::skip]
    pub const fn record(&self) -> &'a EdgeRecord { self.record }

    /// Returns the strategy payload.
    #[must_use]
    #[rustfmt::skip]
    pub const fn payload(&self) -> &'a [f64] { self.payload }

    /// Returns the current weight.
    #[must_use]
    #[rustfmt::skip]
    pub const fn weight(&self) -> f64 { self.record.weight() }

    /// Returns the affinity.
    #[must_use]
    #[rustfmt::skip]
    pub const fn affinity(&self) -> f64 { self.record.affinity() }

    /// Returns the first endpoint.
    #[must_use]
    #[rustfmt::skip]
    pub const fn from(&self) -> NodeId { self.record.from() }

    /// Returns the second endpoint.
    #[must_use]
    #[rustfmt::skip]
    pub const fn to(&self) -> NodeId { self.record.to() }

    /// Returns the accumulated observation count.
    #[must_use]
    #[rustfmt::skip]
    pub const fn multiplicity(&self) -> u64 { self.record.multiplicity() }

    /// Returns `true` when the weight must be recomputed.
    #[must_use]
    #[rustfmt::skip]
    pub const fn is_stale(&self) -> bool { self.record.is_stale() }

    /// Returns `true` when the edge has been logically deleted.
    #[must_use]
    #[rustfmt::skip]
    pub const fn is_obsolete(&self) -> bool { self.record.is_obsolete() }

    /// Returns `true` when the edge is live.
    #[must_use]
    #[rustfmt::skip]
    pub const fn is_valid(&self) -> bool { self.record.is_valid() }

    /// Returns `true` when the weight is current.
    #[must_use]
    #[rustfmt::skip]
    pub const fn is_active(&self) -> bool { self.record.is_active() }
}

/// Writable view of one edge record and its payload.
#[derive(Debug)]
pub struct EdgeMut<'a> {
    index: EdgeIndex,
    record: &'a mut EdgeRecord,
    payload: &'a mut [f64],
}

impl EdgeMut<'_> {
    /// Reborrows the view as read-only.
    #[must_use]
    pub fn view(&self) -> EdgeRef<'_> {
        EdgeRef {
            index: self.index,
            record: &*self.record,
            payload: &*self.payload,
        }
    }

    /// Returns the record's index in its store.
    #[must_use]
    #[rustfmt::skip]
    pub const fn index(&self) -> EdgeIndex { self.index }

    /// Returns the current weight.
    #[must_use]
    #[rustfmt::skip]
    pub const fn weight(&self) -> f64 { self.record.weight() }

    /// Returns the affinity.
    #[must_use]
    #[rustfmt::skip]
    pub const fn affinity(&self) -> f64 { self.record.affinity() }

    /// Returns the first endpoint.
    #[must_use]
    #[rustfmt::skip]
    pub const fn from(&self) -> NodeId { self.record.from() }

    /// Returns the second endpoint.
    #[must_use]
    #[rustfmt::skip]
    pub const fn to(&self) -> NodeId { self.record.to() }

    /// Returns the accumulated observation count.
    #[must_use]
    #[rustfmt::skip]
    pub const fn multiplicity(&self) -> u64 { self.record.multiplicity() }

    /// Returns the strategy payload.
    #[must_use]
    pub fn payload(&self) -> &[f64] {
        &*self.payload
    }

    /// Returns the strategy payload for writing.
    pub fn payload_mut(&mut self) -> &mut [f64] {
        &mut *self.payload
    }

    /// Sets the weight.
    pub const fn set_weight(&mut self, weight: f64) {
        self.record.weight = weight;
    }

    /// Sets the affinity.
    pub const fn set_affinity(&mut self, affinity: f64) {
        self.record.affinity = affinity;
    }

    /// Rewrites both endpoints.
    pub const fn set_endpoints(&mut self, from: NodeId, to: NodeId) {
        self.record.from = from;
        self.record.to = to;
    }

    /// Sets the accumulated observation count.
    pub const fn set_multiplicity(&mut self, multiplicity: u64) {
        self.record.multiplicity = multiplicity;
    }

    /// Flags the weight for recomputation.
    pub const fn mark_stale(&mut self) {
        self.record.status.insert(EdgeStatus::STALE);
    }

    /// Clears the stale flag after a reweighting.
    pub const fn mark_active(&mut self) {
        self.record.status.remove(EdgeStatus::STALE);
    }

    /// Logically deletes the edge.
    pub const fn mark_obsolete(&mut self) {
        self.record.status.insert(EdgeStatus::OBSOLETE);
    }

    /// Clears the obsolete flag.
    pub const fn mark_valid(&mut self) {
        self.record.status.remove(EdgeStatus::OBSOLETE);
    }
}
