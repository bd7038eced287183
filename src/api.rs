//! Python binding layer for Day's RF distance matrices.
//!
//! Provides Python functions computing pairwise tree distances from newick
//! strings or from a tree file.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::config::{CompareOptions, MatrixConfig, Metric};
use crate::matrix::{Matrix, build_matrix, matrix_from_file, parse_trees};

fn parse_metric(metric: &str) -> PyResult<Metric> {
    match metric.to_ascii_lowercase().as_str() {
        "rf" => Ok(Metric::Rf),
        "normalized" => Ok(Metric::NormalizedRf),
        "rfl" => Ok(Metric::Rfl),
        other => Err(PyValueError::new_err(format!(
            "Unknown metric '{}', expected one of: rf, normalized, rfl",
            other
        ))),
    }
}

fn config_for(metric: &str, rooted: bool, threads: Option<usize>) -> PyResult<MatrixConfig> {
    let mut config = MatrixConfig::default()
        .with_metric(parse_metric(metric)?)
        .with_compare(CompareOptions::default().with_rooted(rooted));
    if let Some(threads) = threads {
        config = config.with_threads(threads);
    }
    Ok(config)
}

/// Compute pairwise Robinson-Foulds distances between newick strings.
///
/// Args:
///     newicks: List of newick strings, one tree each
///     rooted: Compare the trees as rooted (default: False)
///
/// Returns:
///     A 2D list of integer RF distances
///
/// Raises:
///     ValueError: If a tree cannot be parsed or two trees have different taxa
#[pyfunction]
#[pyo3(signature = (newicks, rooted=false))]
fn pairwise_rf(newicks: Vec<String>, rooted: bool) -> PyResult<Vec<Vec<usize>>> {
    let config = config_for("rf", rooted, None)?;
    let trees = parse_trees(&newicks, &config.parse).map_err(|e| PyValueError::new_err(e.to_string()))?;
    let matrix = build_matrix(&trees, &config).map_err(|e| PyValueError::new_err(e.to_string()))?;

    Ok(matrix
        .into_iter()
        .map(|row| row.into_iter().map(|d| d as usize).collect())
        .collect())
}

/// Compute a pairwise distance matrix from a tree file.
///
/// Args:
///     path: File with one newick tree per line (.gz accepted)
///     metric: One of "rf", "normalized", "rfl" (default: "rf")
///     rooted: Compare the trees as rooted (default: False)
///     threads: Worker count (default: all available cores)
///
/// Returns:
///     A 2D list of distances
///
/// Raises:
///     ValueError: If the file cannot be read, a tree cannot be parsed, or
///     two trees have different taxa
#[pyfunction]
#[pyo3(signature = (path, metric="rf", rooted=false, threads=None))]
fn pairwise_distances(
    path: String,
    metric: &str,
    rooted: bool,
    threads: Option<usize>,
) -> PyResult<Matrix> {
    let config = config_for(metric, rooted, threads)?;
    matrix_from_file(&path, &config).map_err(|e| PyValueError::new_err(e.to_string()))
}

/// Python module definition
#[pymodule]
fn days_rf(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(pairwise_rf, m)?)?;
    m.add_function(wrap_pyfunction!(pairwise_distances, m)?)?;
    Ok(())
}
