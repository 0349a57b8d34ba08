//! In-memory vector datasets.
//!
//! A [`Dataset`] is an immutable N x D matrix stored flat in row-major order,
//! the layout every family hashes against and the query engine ranks against.
//! Element types are real ([`f32`], most families) or unsigned integer
//! ([`u32`], the random-bit-sampling family).

use crate::error::{LshError, Result};

/// Scalar element type a dataset can hold.
///
/// Implemented for `f32` and `u32`. Hash families constrain which element
/// type they accept through their `HashFamily<T>` impl.
pub trait Element: Copy + PartialEq + Send + Sync + 'static {
    /// Widen to `f32` for projections and distance computation.
    fn to_f32(self) -> f32;
}

impl Element for f32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self
    }
}

impl Element for u32 {
    #[inline]
    fn to_f32(self) -> f32 {
        self as f32
    }
}

/// Immutable matrix of `n` vectors of fixed dimension `dim`.
///
/// Point identifiers are row indices `0..n` and stay stable for the lifetime
/// of any index built over this dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T> {
    data: Vec<T>,
    n: usize,
    dim: usize,
}

impl<T: Element> Dataset<T> {
    /// Build a dataset from row vectors.
    ///
    /// Fails with [`LshError::DimensionMismatch`] if rows have inconsistent
    /// lengths and with [`LshError::InvalidParameter`] if the rows are
    /// zero-length. An empty row set is accepted here; `build` rejects it.
    pub fn from_rows(rows: &[Vec<T>]) -> Result<Self> {
        let dim = rows.first().map_or(0, Vec::len);
        if !rows.is_empty() && dim == 0 {
            return Err(LshError::InvalidParameter(
                "dataset dimension must be positive".to_string(),
            ));
        }
        let mut data = Vec::with_capacity(rows.len() * dim);
        for row in rows {
            if row.len() != dim {
                return Err(LshError::DimensionMismatch {
                    expected: dim,
                    actual: row.len(),
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self {
            data,
            n: rows.len(),
            dim,
        })
    }

    /// Build a dataset from an already-flat row-major buffer.
    pub fn from_flat(data: Vec<T>, dim: usize) -> Result<Self> {
        if dim == 0 {
            return Err(LshError::InvalidParameter(
                "dataset dimension must be positive".to_string(),
            ));
        }
        if data.len() % dim != 0 {
            return Err(LshError::DimensionMismatch {
                expected: dim,
                actual: data.len() % dim,
            });
        }
        let n = data.len() / dim;
        Ok(Self { data, n, dim })
    }

    /// Number of vectors.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// True if the dataset holds no vectors.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Vector dimension.
    #[inline]
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Borrow row `i`.
    ///
    /// Panics if `i >= len()`; callers index with identifiers produced by
    /// the same dataset.
    #[inline]
    pub fn row(&self, i: usize) -> &[T] {
        let start = i * self.dim;
        &self.data[start..start + self.dim]
    }

    /// Iterate over all rows in identifier order.
    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.n).map(move |i| self.row(i))
    }
}
