//! Error types for parsing, preparing and comparing trees.

use thiserror::Error;

/// Errors raised while reading a single Newick string.
#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("The tree is missing a semicolon at the end")]
    MissingSemicolon,
    #[error("Unbalanced parentheses at position {position}")]
    UnbalancedParentheses { position: usize },
    #[error("Comment opened at position {position} is never closed")]
    UnclosedComment { position: usize },
    #[error("Cannot read branch length '{token}'")]
    InvalidBranchLength { token: String },
    #[error("Empty newick string")]
    Empty,
}

/// Errors raised while turning a parsed tree into a reference snapshot.
#[derive(Error, Debug, PartialEq)]
pub enum TreeError {
    #[error("All your leaf nodes must be named.")]
    UnnamedLeaf,
    #[error("Leaf name '{0}' appears more than once.")]
    DuplicateLeafName(String),
    #[error("Tree has {found} leaves, at least {required} are needed for a comparison.")]
    TooFewLeaves { found: usize, required: usize },
}

/// A pair of trees that cannot be compared.
#[derive(Error, Debug, PartialEq)]
pub enum CompareError {
    #[error("Leaf '{0}' is not in the reference tree")]
    UnknownLeaf(String),
    #[error("Reference has {expected} leaves but the compared tree has {visited}")]
    LeafCountMismatch { expected: usize, visited: usize },
    #[error("The compared tree has an unnamed leaf")]
    UnnamedLeaf,
    #[error("Leaf '{0}' appears more than once in the compared tree")]
    DuplicateLeaf(String),
}

/// Failures of a one-off comparison between two parsed trees.
#[derive(Error, Debug, PartialEq)]
pub enum DistanceError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error(transparent)]
    Compare(#[from] CompareError),
}

/// Failures of a full distance matrix computation.
#[derive(Error, Debug)]
pub enum MatrixError {
    #[error("Failed to parse tree on line {line}: {source}")]
    Parse { line: usize, source: ParseError },
    #[error("Tree {row} cannot be used as a reference: {source}")]
    Prepare { row: usize, source: TreeError },
    #[error("Trees {row} and {col} are not comparable: {source}")]
    Incomparable {
        row: usize,
        col: usize,
        source: CompareError,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
