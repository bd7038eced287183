//! Crate root: lightweight module orchestration and public re-exports.
//!
//! Modules:
//! - `tree`: arena trees and the iterative postorder walk.
//! - `newick`: character-level newick parser.
//! - `snapshot`: reference snapshots (Day's interval table) for one tree.
//! - `distances`: Day's linear-time RF / RFL comparison against a snapshot.
//! - `matrix`: parallel all-pairs matrix with sequential fallback.
//! - `io`: reading tree files and writing CSV matrices.
//! - `config`: parser, comparison and matrix options.
//! - `errors`: error types.
//! - `api`: Python bindings via `pyo3` (gated behind "python" feature).

pub mod config;
pub mod distances;
pub mod errors;
pub mod io;
pub mod matrix;
pub mod newick;
pub mod snapshot;
pub mod tree;

#[cfg(feature = "python")]
pub mod api;

// Re-export frequently used types & functions
pub use config::{CompareOptions, MatrixConfig, Metric, ParseOptions};
pub use distances::{Comparison, compare, robinson_foulds};
pub use errors::{CompareError, DistanceError, MatrixError, ParseError, TreeError};
pub use io::{read_newick_lines, write_matrix_csv};
pub use matrix::{Matrix, build_matrix, build_sequential, matrix_from_file, parse_trees};
pub use newick::{parse_all, parse_newick};
pub use snapshot::{Interval, ReferenceSnapshot};
pub use tree::{Node, NodeId, Tree};
