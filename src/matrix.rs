//! All-pairs distance matrices built row by row.
//!
//! Row `i` prepares tree `i` as the reference and compares every tree
//! `j > i` against it. Rows are independent, so they are the unit of work of
//! a fixed-size rayon pool: each row task reports `(i, result)` over a
//! channel and rows are placed by index, never by arrival order.
//!
//! Parsed trees are shared read-only between workers; every worker builds
//! its own [`ReferenceSnapshot`] and only writes its own row.
//!
//! If the parallel run fails (the pool cannot start, a row task panics, or a
//! row never reports) every parallel result is discarded and the whole
//! matrix is recomputed on the calling thread.
//!
//! An incomparable pair aborts the whole matrix with
//! [`MatrixError::Incomparable`]; it is deterministic, so it never triggers
//! the sequential restart.

use crate::config::{MatrixConfig, ParseOptions};
use crate::distances::compare;
use crate::errors::MatrixError;
use crate::io::read_newick_lines;
use crate::newick::parse_newick;
use crate::snapshot::ReferenceSnapshot;
use crate::tree::Tree;
use log::{debug, info, warn};
use rayon::ThreadPoolBuilder;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::mpsc;

/// Dense, symmetric matrix with a zero diagonal.
pub type Matrix = Vec<Vec<f64>>;

/// Distances of one reference row to every later tree.
type Row = Vec<f64>;

/// Parses one tree per line, failing on the first bad line (1-based).
pub fn parse_trees<S: AsRef<str>>(
    lines: &[S],
    options: &ParseOptions,
) -> Result<Vec<Tree>, MatrixError> {
    parse_numbered(
        lines.iter().enumerate().map(|(i, line)| (i + 1, line.as_ref())),
        options,
    )
}

fn parse_numbered<'a, I>(lines: I, options: &ParseOptions) -> Result<Vec<Tree>, MatrixError>
where
    I: IntoIterator<Item = (usize, &'a str)>,
{
    lines
        .into_iter()
        .map(|(line, text)| {
            parse_newick(text, options).map_err(|source| MatrixError::Parse { line, source })
        })
        .collect()
}

/// Computes row `row`: tree `row` against trees `row + 1..`.
pub fn distance_row(trees: &[Tree], row: usize, config: &MatrixConfig) -> Result<Row, MatrixError> {
    let reference = ReferenceSnapshot::from_tree(&trees[row], config.compare)
        .map_err(|source| MatrixError::Prepare { row, source })?;

    trees
        .iter()
        .enumerate()
        .skip(row + 1)
        .map(|(col, tree)| {
            compare(tree, &reference)
                .map(|cmp| cmp.value(config.metric))
                .map_err(|source| MatrixError::Incomparable { row, col, source })
        })
        .collect()
}

/// Builds the matrix on the calling thread only.
pub fn build_sequential(trees: &[Tree], config: &MatrixConfig) -> Result<Matrix, MatrixError> {
    let rows = run_sequential(trees.len(), &|row| distance_row(trees, row, config))?;
    Ok(assemble(trees.len(), rows))
}

/// Builds the matrix on a worker pool, falling back to a sequential run.
pub fn build_matrix(trees: &[Tree], config: &MatrixConfig) -> Result<Matrix, MatrixError> {
    let workers = config.threads.unwrap_or_else(available_workers);
    info!(
        "Computing {} rows ({} comparisons) on {workers} workers",
        trees.len(),
        trees.len() * trees.len().saturating_sub(1) / 2
    );
    let rows = build_rows(trees.len(), workers, &|row| distance_row(trees, row, config))?;
    Ok(assemble(trees.len(), rows))
}

/// Reads a tree file (one newick per line) and builds its matrix.
pub fn matrix_from_file<P: AsRef<Path>>(path: P, config: &MatrixConfig) -> Result<Matrix, MatrixError> {
    let lines = read_newick_lines(path)?;
    let trees = parse_numbered(
        lines.iter().map(|(line, text)| (*line, text.as_str())),
        &config.parse,
    )?;
    info!("Parsed {} trees", trees.len());
    build_matrix(&trees, config)
}

fn available_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

/// Parallel attempt first; any worker failure restarts everything serially.
pub(crate) fn build_rows<F>(n: usize, workers: usize, row_fn: &F) -> Result<Vec<Row>, MatrixError>
where
    F: Fn(usize) -> Result<Row, MatrixError> + Sync,
{
    match run_parallel(n, workers, row_fn) {
        Some(rows) => rows.into_iter().collect(),
        None => {
            warn!("Multiprocessing failed - trying on single core");
            run_sequential(n, row_fn)
        }
    }
}

/// Runs every row on a pool of `workers` threads.
///
/// Returns `None` when the pool itself failed; row errors are returned in
/// row order so the first reported error does not depend on scheduling.
fn run_parallel<F>(n: usize, workers: usize, row_fn: &F) -> Option<Vec<Result<Row, MatrixError>>>
where
    F: Fn(usize) -> Result<Row, MatrixError> + Sync,
{
    let pool = match ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => pool,
        Err(e) => {
            warn!("Cannot start a pool of {workers} workers: {e}");
            return None;
        }
    };
    debug!("Started pool with {} workers", pool.current_num_threads());

    let (tx, rx) = mpsc::channel();
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        pool.scope(|scope| {
            for row in 0..n {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = row_fn(row);
                    debug!("Row {row} done");
                    // The receiver outlives the scope.
                    let _ = tx.send((row, result));
                });
            }
        })
    }));
    drop(tx);

    if outcome.is_err() {
        warn!("A worker failed, discarding all parallel results");
        return None;
    }

    let mut slots: Vec<Option<Result<Row, MatrixError>>> = (0..n).map(|_| None).collect();
    for (row, result) in rx {
        slots[row] = Some(result);
    }
    let rows: Option<Vec<_>> = slots.into_iter().collect();
    if rows.is_none() {
        warn!("Some rows were never reported, discarding all parallel results");
    }
    rows
}

fn run_sequential<F>(n: usize, row_fn: &F) -> Result<Vec<Row>, MatrixError>
where
    F: Fn(usize) -> Result<Row, MatrixError>,
{
    (0..n).map(row_fn).collect()
}

/// Mirrors upper-triangle rows into a full matrix.
fn assemble(n: usize, rows: Vec<Row>) -> Matrix {
    let mut mat = vec![vec![0.0f64; n]; n];
    for (i, row) in rows.into_iter().enumerate() {
        for (k, d) in row.into_iter().enumerate() {
            let j = i + 1 + k;
            mat[i][j] = d;
            mat[j][i] = d;
        }
    }
    mat
}
