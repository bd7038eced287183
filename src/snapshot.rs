//! Reference snapshots for Day's (1985) Robinson-Foulds algorithm.
//!
//! # Overview
//! A [`ReferenceSnapshot`] captures every bipartition of one tree as an
//! interval of leaf indices. Leaves are numbered in postorder, so every
//! subtree of the reference covers a contiguous run `[L, R]` and the whole
//! split table fits in an array of `num_leaves` slots. Other trees are then
//! compared against it in linear time (see [`crate::distances`]).
//!
//! The snapshot is immutable once built and can be shared between threads.
//!
//! # Canonicalization
//! In unrooted mode a bipartition `[L, R]` containing leaf 0 is stored as its
//! complement `[R + 1, n - 1]`, i.e. the tree is conceptually re-rooted at
//! leaf 0. Two unrooted trees written with different roots therefore produce
//! identical tables.
//!
//! ```text
//!   ((A,B),(C,D),E)     leaves: A=0 B=1 C=2 D=3 E=4
//!
//!   | Node  | Interval | Has leaf 0? | Stored as |
//!   |-------|----------|-------------|-----------|
//!   | (A,B) | [0, 1]   | yes         | [2, 4]    |
//!   | (C,D) | [2, 3]   | no          | [2, 3]    |
//! ```
//!
//! # Table slots
//! A subtree that is the last child of its parent shares its right end with
//! the parent, so it is filed under its left end when that slot is free;
//! every other interval is filed under its right end. Flipped intervals go
//! under their left end.

use crate::config::CompareOptions;
use crate::errors::TreeError;
use crate::tree::{NodeId, Span, SpanTracker, Step, Tree};
use std::collections::HashMap;

/// A bipartition expressed as an inclusive range of leaf indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Interval {
    pub left: usize,
    pub right: usize,
}

impl Interval {
    pub fn new(left: usize, right: usize) -> Self {
        Self { left, right }
    }

    /// Number of leaves inside the interval.
    pub fn size(&self) -> usize {
        self.right + 1 - self.left
    }
}

/// The prepared form of a reference tree.
#[derive(Debug, Clone)]
pub struct ReferenceSnapshot {
    /// Leaf name → index, assigned in postorder.
    pub leaf_index: HashMap<String, usize>,
    /// Day's table: slot `i` holds the interval filed under `i`, if any.
    pub node_table: Vec<Option<Interval>>,
    pub num_leaves: usize,
    /// Internal branches above the length threshold.
    pub num_branches: usize,
    /// Terminal branch length per leaf index.
    pub leaf_lengths: Vec<f64>,
    /// Length of each stored (canonical) interval.
    pub branch_lengths: HashMap<Interval, f64>,
    /// Sum of `branch_lengths`.
    pub total_internal_length: f64,
    pub options: CompareOptions,
}

impl ReferenceSnapshot {
    /// Prepares `tree` as a comparison reference.
    ///
    /// # Errors
    /// - [`TreeError::UnnamedLeaf`] / [`TreeError::DuplicateLeafName`] if
    ///   leaves cannot be identified unambiguously
    /// - [`TreeError::TooFewLeaves`] below 3 leaves (rooted) or 4 (unrooted),
    ///   where no interval comparison is meaningful
    pub fn from_tree(tree: &Tree, options: CompareOptions) -> Result<Self, TreeError> {
        let num_leaves = tree.num_leaves();
        let required = min_leaves(options.rooted);
        if num_leaves < required {
            return Err(TreeError::TooFewLeaves {
                found: num_leaves,
                required,
            });
        }

        let mut snapshot = ReferenceSnapshot {
            leaf_index: HashMap::with_capacity(num_leaves),
            node_table: vec![None; num_leaves],
            num_leaves,
            num_branches: 0,
            leaf_lengths: Vec::with_capacity(num_leaves),
            branch_lengths: HashMap::new(),
            total_internal_length: 0.0,
            options,
        };

        let mut tracker = SpanTracker::new(tree);
        for step in tree.postorder() {
            match step {
                Step::Leaf(id) => {
                    let node = tree.get(id);
                    let name = node.name.clone().ok_or(TreeError::UnnamedLeaf)?;
                    let index = snapshot.leaf_lengths.len();
                    if snapshot.leaf_index.insert(name.clone(), index).is_some() {
                        return Err(TreeError::DuplicateLeafName(name));
                    }
                    snapshot.leaf_lengths.push(node.length);
                    tracker.leaf(node.parent, index);
                }
                Step::Internal(id) => {
                    let span = tracker.complete(tree.get(id).parent, id);
                    if id == tree.root() {
                        continue;
                    }
                    if let Some(length) = branch_length(tree, id, &options) {
                        if is_informative(&span, num_leaves, options.rooted) {
                            snapshot.insert(tree, id, span, length);
                        }
                    }
                }
            }
        }

        Ok(snapshot)
    }

    fn insert(&mut self, tree: &Tree, id: NodeId, span: Span, length: f64) {
        let interval = canonical_interval(&span, self.num_leaves, self.options.rooted);
        let flipped = interval.left != span.min;
        let slot = if flipped {
            interval.left
        } else if is_last_child(tree, id) && self.node_table[interval.left].is_none() {
            interval.left
        } else {
            interval.right
        };
        self.node_table[slot] = Some(interval);
        self.branch_lengths.insert(interval, length);
        self.num_branches += 1;
        self.total_internal_length += length;
    }

    /// True if `interval` is a bipartition of the reference.
    pub fn contains(&self, interval: Interval) -> bool {
        self.node_table[interval.left] == Some(interval)
            || self.node_table[interval.right] == Some(interval)
    }

    pub fn branch_length(&self, interval: Interval) -> Option<f64> {
        self.branch_lengths.get(&interval).copied()
    }

    /// Denominator of the normalized RF distance.
    pub fn max_differences(&self) -> usize {
        if self.options.rooted {
            self.num_branches + self.num_leaves - 2
        } else {
            self.num_branches + self.num_leaves - 3
        }
    }
}

pub(crate) fn min_leaves(rooted: bool) -> usize {
    if rooted { 3 } else { 4 }
}

/// Length of the branch above `id`, or `None` if it does not count.
///
/// At an unrooted root with exactly two children the two root branches are
/// one branch: its length is the sum and it is reported on the second child
/// only. Branches not longer than the threshold are dropped.
pub(crate) fn branch_length(tree: &Tree, id: NodeId, options: &CompareOptions) -> Option<f64> {
    let node = tree.get(id);
    let parent = tree.get(node.parent?);
    let length = if !options.rooted && node.parent == Some(tree.root()) && parent.children.len() == 2
    {
        if parent.children[1] != id {
            return None;
        }
        node.length + tree.get(parent.children[0]).length
    } else {
        node.length
    };
    (length > options.min_branch_length).then_some(length)
}

/// Length of the edge between `id` and the node `up` it hangs from in a walk
/// that may run against parent links, or `None` if it does not count.
///
/// An unrooted root with exactly two children is not a branching point: the
/// walk passes through it and the edge below it carries both root branches.
pub(crate) fn edge_length(tree: &Tree, id: NodeId, up: NodeId, options: &CompareOptions) -> Option<f64> {
    let root = tree.get(tree.root());
    let merged = !options.rooted && root.children.len() == 2;
    let length = if merged && id == tree.root() {
        return None;
    } else if merged && up == tree.root() {
        root.children.iter().map(|&c| tree.get(c).length).sum()
    } else if tree.get(id).parent == Some(up) {
        tree.get(id).length
    } else {
        tree.get(up).length
    };
    (length > options.min_branch_length).then_some(length)
}

/// Unrooted splits with a single leaf on either side are trivial.
pub(crate) fn is_informative(span: &Span, num_leaves: usize, rooted: bool) -> bool {
    if rooted {
        span.descendants >= 2
    } else {
        span.descendants >= 2 && span.descendants + 2 <= num_leaves
    }
}

/// Rewrites a contiguous span into its table representation.
pub(crate) fn canonical_interval(span: &Span, num_leaves: usize, rooted: bool) -> Interval {
    if rooted || span.min > 0 {
        Interval::new(span.min, span.max)
    } else {
        Interval::new(span.max + 1, num_leaves - 1)
    }
}

fn is_last_child(tree: &Tree, id: NodeId) -> bool {
    tree.get(id)
        .parent
        .and_then(|p| tree.get(p).children.last().copied())
        == Some(id)
}
