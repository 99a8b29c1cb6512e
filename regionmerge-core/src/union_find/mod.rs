//! Sparse union-find (disjoint set union) over arbitrary identifiers.
//!
//! Identifiers are materialised lazily: the first time an unseen id is looked
//! up it becomes a singleton root. The merging engine keeps two independent
//! instances, one long-lived over graph nodes and one rebuilt every pass over
//! tied edges, so the type is generic over the identifier.

use std::{collections::HashMap, hash::Hash};

use crate::edge::NodeId;

/// Path-compressing, union-by-rank disjoint sets backed by hash maps.
///
/// # Examples
/// ```
/// use regionmerge_core::SparseUnionFind;
///
/// let mut sets = SparseUnionFind::<u64>::new();
/// let root = sets.join(10, 20);
/// assert_eq!(sets.find_root(10), root);
/// assert_eq!(sets.find_root(20), root);
/// assert_eq!(sets.set_count(), 1);
/// assert_eq!(sets.len(), 2);
/// ```
#[derive(Clone, Debug)]
pub struct SparseUnionFind<Id = NodeId> {
    parent: HashMap<Id, Id>,
    rank: HashMap<Id, u64>,
    set_count: usize,
}

impl<Id> Default for SparseUnionFind<Id> {
    fn default() -> Self {
        Self {
            parent: HashMap::new(),
            rank: HashMap::new(),
            set_count: 0,
        }
    }
}

impl<Id> SparseUnionFind<Id>
where
    Id: Copy + Eq + Hash,
{
    /// Creates an empty structure.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a structure with every id in `ids` materialised as a
    /// singleton.
    #[must_use]
    pub fn with_ids<I>(ids: I) -> Self
    where
        I: IntoIterator<Item = Id>,
    {
        let mut sets = Self::new();
        for id in ids {
            sets.materialise(id);
        }
        sets
    }

    /// Returns the representative of `id`, compressing the path walked.
    ///
    /// An unseen `id` becomes a new singleton and is its own root.
    pub fn find_root(&mut self, id: Id) -> Id {
        if self.materialise(id) {
            return id;
        }

        let mut root = id;
        while let Some(&parent) = self.parent.get(&root) {
            if parent == root {
                break;
            }
            root = parent;
        }

        let mut node = id;
        while node != root {
            let Some(parent) = self.parent.insert(node, root) else {
                break;
            };
            node = parent;
        }

        root
    }

    /// Merges the sets holding `left` and `right` and returns the surviving
    /// representative.
    ///
    /// The lower-rank root is attached beneath the higher-rank root; on a tie
    /// the root of `right` is attached beneath the root of `left`, whose rank
    /// grows by one. Joining ids that already share a root changes nothing.
    pub fn join(&mut self, left: Id, right: Id) -> Id {
        let left = self.find_root(left);
        let right = self.find_root(right);
        if left == right {
            return left;
        }

        let left_rank = self.rank_of(left);
        let right_rank = self.rank_of(right);
        self.set_count -= 1;

        if left_rank < right_rank {
            self.parent.insert(left, right);
            return right;
        }

        self.parent.insert(right, left);
        if left_rank == right_rank {
            self.rank.insert(left, left_rank.saturating_add(1));
        }
        left
    }

    /// Returns the representative of `id` without compressing or
    /// materialising anything.
    #[must_use]
    pub fn root_of(&self, id: Id) -> Option<Id> {
        let mut current = id;
        loop {
            let parent = *self.parent.get(&current)?;
            if parent == current {
                return Some(current);
            }
            current = parent;
        }
    }

    /// Returns `true` when `id` has been materialised.
    #[must_use]
    pub fn contains(&self, id: Id) -> bool {
        self.parent.contains_key(&id)
    }

    /// Returns the number of disjoint sets.
    #[must_use]
    pub fn set_count(&self) -> usize {
        self.set_count
    }

    /// Returns the number of materialised ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Returns `true` when no id has been materialised.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Iterates over every materialised id in unspecified order.
    pub fn ids(&self) -> impl Iterator<Item = Id> + '_ {
        self.parent.keys().copied()
    }

    /// Inserts `id` as a singleton if unseen. Returns `true` when inserted.
    fn materialise(&mut self, id: Id) -> bool {
        if self.parent.contains_key(&id) {
            return false;
        }
        self.parent.insert(id, id);
        self.rank.insert(id, 0);
        self.set_count += 1;
        true
    }

    fn rank_of(&self, id: Id) -> u64 {
        self.rank.get(&id).copied().unwrap_or(0)
    }
}
