//! Linear-algebra seam for the spectral and iterative-quantization families.
//!
//! Everything numeric that needs an eigen-decomposition or SVD goes through
//! this module so the backend stays swappable and testable on small synthetic
//! matrices. Computation runs in `f64` even though datasets are `f32`; the
//! covariance of a large matrix loses too much precision in single floats.

use nalgebra::DMatrix;

use crate::dataset::{Dataset, Element};
use crate::error::{LshError, Result};

/// Copy a dataset into a dense `n x d` matrix.
pub(crate) fn dataset_matrix<T: Element>(dataset: &Dataset<T>) -> DMatrix<f64> {
    DMatrix::from_fn(dataset.len(), dataset.dim(), |i, j| {
        dataset.row(i)[j].to_f32() as f64
    })
}

/// Covariance of the rows of `x`, optionally mean-centered.
///
/// Uncentered covariance is `x^T x`; centered divides by `n - 1` as a sample
/// covariance. Which one a family wants depends on whether its projection
/// step subtracts the mean.
pub(crate) fn covariance(x: &DMatrix<f64>, center: bool) -> DMatrix<f64> {
    if center {
        let n = x.nrows().max(2);
        let mean = x.row_mean();
        let mut centered = x.clone();
        for mut row in centered.row_iter_mut() {
            row -= &mean;
        }
        centered.transpose() * &centered / (n as f64 - 1.0)
    } else {
        x.transpose() * x
    }
}

/// Top-`k` eigenvectors of a symmetric matrix, as the columns of a `d x k`
/// matrix ordered by descending eigenvalue.
pub(crate) fn top_eigenvectors(sym: DMatrix<f64>, k: usize) -> Result<DMatrix<f64>> {
    let d = sym.nrows();
    if k == 0 || k > d {
        return Err(LshError::InvalidParameter(format!(
            "requested {k} principal components from a {d}-dimensional space"
        )));
    }
    let eig = nalgebra::SymmetricEigen::new(sym);
    let mut order: Vec<usize> = (0..d).collect();
    order.sort_by(|&a, &b| {
        eig.eigenvalues[b]
            .partial_cmp(&eig.eigenvalues[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(DMatrix::from_fn(d, k, |i, j| {
        eig.eigenvectors[(i, order[j])]
    }))
}

/// Thin SVD factors `(u, v_t)` of `m`.
pub(crate) fn svd_factors(m: DMatrix<f64>) -> Result<(DMatrix<f64>, DMatrix<f64>)> {
    let svd = m.svd(true, true);
    let u = svd
        .u
        .ok_or_else(|| LshError::InvalidParameter("SVD did not converge".to_string()))?;
    let v_t = svd
        .v_t
        .ok_or_else(|| LshError::InvalidParameter("SVD did not converge".to_string()))?;
    Ok((u, v_t))
}
