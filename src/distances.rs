//! Day's (1985) linear-time Robinson-Foulds comparison.
//!
//! A tree is compared against a [`ReferenceSnapshot`] with the same
//! iterative postorder walk used to prepare the reference. Leaves take the
//! reference's indices, so every subtree yields a span of indices. A span
//! matches a reference bipartition when it is gap-free (its width equals its
//! leaf count) and its canonical interval sits in the reference table. No
//! set comparison happens, each pair costs O(n).
//!
//! Unrooted trees are walked hanging from the leaf with reference index 0,
//! wherever the newick string put the root. The reference stores the side of
//! each split without leaf 0, and no subtree of that walk contains leaf 0,
//! so identical splits always meet in the same form.
//!
//! Three values come out of one pass:
//!
//! 1. **Robinson-Foulds (RF)**: reference branches not found plus branches of
//!    this tree missing from the reference.
//! 2. **Normalized RF**: RF divided by `num_branches + n - 2` (rooted) or
//!    `num_branches + n - 3` (unrooted).
//! 3. **RFL**: length-aware RF. Matched branches (terminal ones included)
//!    add `|length_ref - length|`, unmatched branches of either tree add
//!    their full length.

use crate::config::{CompareOptions, Metric};
use crate::errors::{CompareError, DistanceError};
use crate::snapshot::{ReferenceSnapshot, canonical_interval, edge_length, is_informative};
use crate::tree::{SpanTracker, Step, Tree};
use log::warn;

#[cfg(test)]
use itertools::Itertools;

/// Metrics of one comparison against a reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Comparison {
    /// Unweighted RF distance.
    pub distance: usize,
    /// `distance` scaled into `[0, 1]`.
    pub normalized: f64,
    pub num_leaves: usize,
    /// Reference branches also present in the compared tree.
    pub found_branches: usize,
    /// Branches of the compared tree absent from the reference.
    pub missed_branches: usize,
    /// Reference branches absent from the compared tree.
    pub unmatched_reference_branches: usize,
    /// RFL / Kuhner-Felsenstein style length distance.
    pub weighted_length: f64,
}

impl Comparison {
    /// The value a matrix cell holds for `metric`.
    pub fn value(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Rf => self.distance as f64,
            Metric::NormalizedRf => self.normalized,
            Metric::Rfl => self.weighted_length,
        }
    }
}

/// Compares `tree` against a prepared reference.
///
/// # Errors
/// The pair is incomparable when `tree` has a leaf unknown to the reference,
/// repeats a leaf, has an unnamed leaf, or does not cover every reference
/// leaf.
pub fn compare(tree: &Tree, reference: &ReferenceSnapshot) -> Result<Comparison, CompareError> {
    let options = &reference.options;
    let num_leaves = reference.num_leaves;

    let mut indices: Vec<Option<usize>> = vec![None; tree.len()];
    let mut seen = vec![false; num_leaves];
    let mut visited_leaves = 0;
    let mut length_diffs = 0.0;
    for step in tree.postorder() {
        let Step::Leaf(id) = step else {
            continue;
        };
        let node = tree.get(id);
        let name = node.name.as_deref().ok_or(CompareError::UnnamedLeaf)?;
        let Some(&index) = reference.leaf_index.get(name) else {
            warn!("{name} not in reference tree - aborting RF distance");
            return Err(CompareError::UnknownLeaf(name.to_string()));
        };
        if std::mem::replace(&mut seen[index], true) {
            return Err(CompareError::DuplicateLeaf(name.to_string()));
        }
        indices[id] = Some(index);
        visited_leaves += 1;
        length_diffs += (reference.leaf_lengths[index] - node.length).abs();
    }

    if visited_leaves != num_leaves {
        warn!(
            "There are leaves in the reference that have not been found in this new tree - \
             leafCount {num_leaves} visitedLeaves {visited_leaves}"
        );
        return Err(CompareError::LeafCountMismatch {
            expected: num_leaves,
            visited: visited_leaves,
        });
    }

    let start = if options.rooted {
        tree.root()
    } else {
        indices
            .iter()
            .position(|&index| index == Some(0))
            .unwrap_or(tree.root())
    };

    let mut tracker = SpanTracker::new(tree);
    let mut found_branches = 0;
    let mut missed_branches = 0;
    // Starts from every reference branch counted as unmatched.
    let mut rfl = reference.total_internal_length;

    let mut walk = tree.postorder_from(start);
    while let Some(step) = walk.next() {
        let up = walk.towards(step.id());
        let id = match step {
            Step::Leaf(id) => {
                if let Some(index) = indices[id] {
                    tracker.leaf(up, index);
                }
                continue;
            }
            Step::Internal(id) => id,
        };
        let span = tracker.complete(up, id);
        let Some(up) = up else {
            continue;
        };
        let Some(length) = edge_length(tree, id, up, options) else {
            continue;
        };
        if !is_informative(&span, num_leaves, options.rooted) {
            continue;
        }

        let matched = if span.is_contiguous() {
            let interval = canonical_interval(&span, num_leaves, options.rooted);
            if reference.contains(interval) {
                reference.branch_length(interval)
            } else {
                None
            }
        } else {
            None
        };

        match matched {
            Some(reference_length) => {
                found_branches += 1;
                length_diffs += (reference_length - length).abs();
                rfl -= reference_length;
            }
            None => {
                missed_branches += 1;
                rfl += length;
            }
        }
    }

    let unmatched_reference_branches = reference.num_branches - found_branches;
    let distance = unmatched_reference_branches + missed_branches;
    Ok(Comparison {
        distance,
        normalized: distance as f64 / reference.max_differences() as f64,
        num_leaves,
        found_branches,
        missed_branches,
        unmatched_reference_branches,
        weighted_length: rfl + length_diffs,
    })
}

/// Prepares `reference` and compares `tree` against it.
///
/// Use [`ReferenceSnapshot::from_tree`] and [`compare`] directly when one
/// reference is compared against many trees.
pub fn robinson_foulds(
    reference: &Tree,
    tree: &Tree,
    options: CompareOptions,
) -> Result<Comparison, DistanceError> {
    let snapshot = ReferenceSnapshot::from_tree(reference, options)?;
    Ok(compare(tree, &snapshot)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParseOptions;
    use crate::errors::TreeError;
    use crate::newick::parse_newick;

    // https://evolution.genetics.washington.edu/phylip/doc/treedist.html
    const TREEDIST_TREES: [&str; 12] = [
        "(A:0.1,(B:0.1,(H:0.1,(D:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(D:0.1,((J:0.1,H:0.1):0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(D:0.1,(H:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((F:0.1,I:0.1):0.1,(G:0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((F:0.1,I:0.1):0.1,(G:0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,(((J:0.1,H:0.1):0.1,D:0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,(G:0.1,((F:0.1,I:0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(D:0.1,(H:0.1,(J:0.1,(((G:0.1,E:0.1):0.1,(F:0.1,I:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1):0.1);",
        "(A:0.1,(B:0.1,(E:0.1,((G:0.1,(F:0.1,I:0.1):0.1):0.1,((J:0.1,(H:0.1,D:0.1):0.1):0.1,C:0.1):0.1):0.1):0.1):0.1);",
    ];

    const TREEDIST_RF: [[usize; 12]; 12] = [
        [0, 4, 2, 10, 10, 10, 10, 10, 10, 10, 2, 10],
        [4, 0, 2, 10, 8, 10, 8, 10, 8, 10, 2, 10],
        [2, 2, 0, 10, 10, 10, 10, 10, 10, 10, 0, 10],
        [10, 10, 10, 0, 2, 2, 4, 2, 4, 0, 10, 2],
        [10, 8, 10, 2, 0, 4, 2, 4, 2, 2, 10, 4],
        [10, 10, 10, 2, 4, 0, 2, 2, 4, 2, 10, 2],
        [10, 8, 10, 4, 2, 2, 0, 4, 2, 4, 10, 4],
        [10, 10, 10, 2, 4, 2, 4, 0, 2, 2, 10, 0],
        [10, 8, 10, 4, 2, 4, 2, 2, 0, 4, 10, 2],
        [10, 10, 10, 0, 2, 2, 4, 2, 4, 0, 10, 2],
        [2, 2, 0, 10, 10, 10, 10, 10, 10, 10, 0, 10],
        [10, 10, 10, 2, 4, 2, 4, 0, 2, 2, 10, 0],
    ];

    fn parse(s: &str) -> Tree {
        parse_newick(s, &ParseOptions::default()).unwrap()
    }

    fn rf(a: &str, b: &str) -> Comparison {
        robinson_foulds(&parse(a), &parse(b), CompareOptions::default()).unwrap()
    }

    fn rooted_rf(a: &str, b: &str) -> Comparison {
        robinson_foulds(&parse(a), &parse(b), CompareOptions::default().with_rooted(true)).unwrap()
    }

    #[test]
    fn robinson_foulds_treedist() {
        for indices in (0..TREEDIST_TREES.len()).combinations(2) {
            let (i0, i1) = (indices[0], indices[1]);
            let forward = rf(TREEDIST_TREES[i0], TREEDIST_TREES[i1]);
            let backward = rf(TREEDIST_TREES[i1], TREEDIST_TREES[i0]);

            assert_eq!(forward.distance, TREEDIST_RF[i0][i1], "pair [{i0}, {i1}]");
            assert_eq!(backward.distance, TREEDIST_RF[i1][i0], "pair [{i1}, {i0}]");
        }
    }

    #[test]
    fn weighted_length_treedist() {
        // Every branch is 0.1 long, so RFL is RF scaled by 0.1.
        for indices in (0..TREEDIST_TREES.len()).combinations(2) {
            let (i0, i1) = (indices[0], indices[1]);
            let cmp = rf(TREEDIST_TREES[i0], TREEDIST_TREES[i1]);
            let expected = TREEDIST_RF[i0][i1] as f64 * 0.1;
            assert!(
                (cmp.weighted_length - expected).abs() < 1e-9,
                "pair [{i0}, {i1}]: {} != {expected}",
                cmp.weighted_length
            );
        }
    }

    #[test]
    fn test_identity() {
        for newick in TREEDIST_TREES {
            let cmp = rf(newick, newick);
            assert_eq!(cmp.distance, 0);
            assert_eq!(cmp.normalized, 0.0);
            assert_eq!(cmp.found_branches, 7);
            assert_eq!(cmp.missed_branches, 0);
            assert!(cmp.weighted_length.abs() < 1e-12);
        }
        assert_eq!(rf("(A,B,(C,D));", "(A,B,(C,D));").distance, 0);
    }

    #[test]
    fn test_single_swap_on_four_leaves() {
        let cmp = rf("(A,B,(C,D));", "(A,C,(B,D));");
        assert_eq!(cmp.distance, 2);
        assert_eq!(cmp.found_branches, 0);
        assert_eq!(cmp.missed_branches, 1);
        assert_eq!(cmp.unmatched_reference_branches, 1);
        assert_eq!(cmp.num_leaves, 4);
        assert_eq!(cmp.normalized, 1.0);
    }

    #[test]
    fn test_symmetry() {
        let pairs = [
            ("(A,B,(C,D));", "(A,C,(B,D));"),
            ("((A,B),(C,D),(E,F));", "((A,C),(B,D),(E,F));"),
            ("(((A,B),C),(D,(E,F)),G);", "((A,(B,C)),((D,E),F),G);"),
        ];
        for (a, b) in pairs {
            assert_eq!(rf(a, b).distance, rf(b, a).distance, "{a} vs {b}");
            assert_eq!(rooted_rf(a, b).distance, rooted_rf(b, a).distance, "{a} vs {b}");
        }
    }

    #[test]
    fn test_relabeled_copy_matches() {
        // Same bipartitions, children listed in a different order.
        assert_eq!(rf("(A,B,(C,D));", "((D,C),B,A);").distance, 0);
        assert_eq!(
            rf("((A,B),(C,D),(E,F));", "((F,E),((D,C),(B,A)));").distance,
            0
        );
        assert_eq!(
            rooted_rf("((A,(B,C)),(D,E));", "((E,D),((C,B),A));").distance,
            0
        );
    }

    #[test]
    fn test_unrooted_ignores_root_position() {
        assert_eq!(rf("((A,B),(C,D));", "(A,B,(C,D));").distance, 0);
        assert_eq!(rf("(A,B,(C,D));", "((A,B),(C,D));").distance, 0);
        assert_eq!(rf("(((A,B),C),(D,E));", "(A,B,(C,(D,E)));").distance, 0);
        assert_eq!(rf("(A,(B,(C,D)));", "((A,B),(C,D));").distance, 0);
    }

    #[test]
    fn test_unrooted_rerooted_copies_match_both_ways() {
        // Same unrooted topology, rooted on a different internal branch or
        // node; leaf 0 of the reference sits in different root children.
        let pairs = [
            ("(A,(B,C),(D,E));", "((B,C),(A,(D,E)));"),
            ("(A,(B,C,D),E);", "((A,E),B,C,D);"),
            ("((A,B),(C,D),(E,F));", "((C,D),((A,B),(E,F)));"),
            ("((A,B),(C,D),(E,F));", "(((E,F),(A,B)),(C,D));"),
            ("(((A,B),C),(D,(E,F)),G);", "((D,(E,F)),(G,((A,B),C)));"),
        ];
        for (a, b) in pairs {
            let forward = rf(a, b);
            let backward = rf(b, a);
            assert_eq!(forward.distance, 0, "{a} vs {b}");
            assert_eq!(backward.distance, 0, "{b} vs {a}");
            assert_eq!(forward.missed_branches, 0, "{a} vs {b}");
            assert_eq!(backward.missed_branches, 0, "{b} vs {a}");
        }
    }

    #[test]
    fn test_rerooted_weighted_length_is_zero() {
        // The root sits on the (A,B) branch, split 1.5 / 0.5.
        let a = "((A:1,B:1):2,(C:1,D:1):3,(E:1,F:1):4);";
        let b = "(((C:1,D:1):3,(E:1,F:1):4):1.5,(A:1,B:1):0.5);";
        for (x, y) in [(a, b), (b, a)] {
            let cmp = rf(x, y);
            assert_eq!(cmp.distance, 0);
            assert_eq!(cmp.found_branches, 3);
            assert!(cmp.weighted_length.abs() < 1e-12, "{x} vs {y}");
        }

        let shorter = "(((C:1,D:1):3,(E:1,F:1):4):1,(A:1,B:1):0.5);";
        for (x, y) in [(a, shorter), (shorter, a)] {
            assert!((rf(x, y).weighted_length - 0.5).abs() < 1e-12, "{x} vs {y}");
        }
    }

    #[test]
    fn test_rooted_comparison() {
        let cmp = rooted_rf("((A,B),(C,D));", "((A,C),(B,D));");
        assert_eq!(cmp.distance, 4);
        assert_eq!(cmp.normalized, 1.0);

        // Rerooting changes rooted clusters.
        assert_eq!(rooted_rf("((A,B),(C,D));", "(A,(B,(C,D)));").distance, 2);
        assert_eq!(rooted_rf("((A,B),(C,D));", "((B,A),(D,C));").distance, 0);
    }

    #[test]
    fn test_normalized_within_unit_interval() {
        for indices in (0..TREEDIST_TREES.len()).combinations(2) {
            let cmp = rf(TREEDIST_TREES[indices[0]], TREEDIST_TREES[indices[1]]);
            assert!((0.0..=1.0).contains(&cmp.normalized));
            assert_eq!(cmp.normalized, cmp.distance as f64 / 14.0);
        }
        let cmp = rooted_rf("(((A,B),C),(D,E));", "(((E,D),C),(B,A));");
        assert!((0.0..=1.0).contains(&cmp.normalized));
    }

    #[test]
    fn test_weighted_length_counts_leaves_and_matches() {
        let cmp = rf(
            "((A:1,B:1):2,(C:1,D:1):2,E:1);",
            "((A:1.5,B:1):2.5,(C:1,D:1):1,E:1);",
        );
        assert_eq!(cmp.distance, 0);
        // leaf A: 0.5, (A,B): 0.5, (C,D): 1.0
        assert!((cmp.weighted_length - 2.0).abs() < 1e-12);

        let cmp = rf("((A:1,B:1):2,(C:1,D:1):3,E:1);", "((A:1,C:1):4,(B:1,D:1):3,E:1);");
        assert_eq!(cmp.distance, 4);
        // unmatched: 2 + 3 from the reference, 4 + 3 from the other tree
        assert!((cmp.weighted_length - 12.0).abs() < 1e-12);
        assert_eq!(cmp.value(Metric::Rf), 4.0);
        assert_eq!(cmp.value(Metric::Rfl), cmp.weighted_length);
        assert_eq!(cmp.value(Metric::NormalizedRf), cmp.normalized);
    }

    #[test]
    fn test_short_branches_are_ignored() {
        // The (A,C) branch is below the threshold, so only (B,D) differs.
        let cmp = rf("((A,B):1,(C,D):1,(E,F):1);", "((A,C):0.000001,(B,D):1,(E,F):1);");
        assert_eq!(cmp.missed_branches, 1);
        assert_eq!(cmp.found_branches, 1);
        assert_eq!(cmp.distance, 3);
    }

    #[test]
    fn test_non_contiguous_span_is_missed() {
        // Interval [0,2] covered by only two leaves must not match.
        let cmp = rooted_rf("((A,(B,C)),(D,E));", "((A,C),(B,(D,E)));");
        assert_eq!(cmp.found_branches, 1);
        assert_eq!(cmp.distance, 4);
    }

    #[test]
    fn test_incomparable_pairs() {
        let reference = ReferenceSnapshot::from_tree(&parse("(A,B,(C,D));"), CompareOptions::default())
            .unwrap();
        assert_eq!(
            compare(&parse("(A,B,(C,X));"), &reference),
            Err(CompareError::UnknownLeaf("X".to_string()))
        );
        assert_eq!(
            compare(&parse("(A,B,C);"), &reference),
            Err(CompareError::LeafCountMismatch { expected: 4, visited: 3 })
        );
        assert_eq!(
            compare(&parse("(A,B,(C,C));"), &reference),
            Err(CompareError::DuplicateLeaf("C".to_string()))
        );
        assert_eq!(
            compare(&parse("(A,B,(C,));"), &reference),
            Err(CompareError::UnnamedLeaf)
        );
    }

    #[test]
    fn test_degenerate_reference() {
        let err = robinson_foulds(&parse("(A,B);"), &parse("(A,B);"), CompareOptions::default());
        assert_eq!(
            err,
            Err(DistanceError::Tree(TreeError::TooFewLeaves { found: 2, required: 4 }))
        );
    }

    #[test]
    fn test_deep_tree_compares() {
        let depth = 20_000;
        let mut newick = String::new();
        for _ in 0..depth {
            newick.push('(');
        }
        newick.push_str("L0:1,L1:1):1");
        for i in 2..=depth {
            newick.push_str(&format!(",L{i}:1):1"));
        }
        newick.pop();
        newick.pop();
        newick.push(';');
        let tree = parse(&newick);
        let cmp = robinson_foulds(&tree, &tree, CompareOptions::default()).unwrap();
        assert_eq!(cmp.distance, 0);
        assert_eq!(cmp.num_leaves, depth + 1);
    }
}
