//! Numeric backends.
//!
//! Both solvers are written against the [`Backend`] capability set: dense
//! matrices, sparse matrices, a sparse-times-dense product and a handful of
//! element-wise kernels. Vectors are `n x 1` dense matrices.
//!
//! [`burn::BurnBackend`] implements it over any `burn` tensor backend.
//! [`CpuBackend`] (ndarray, `f64`) is the reference; the `gpu` feature adds
//! `WgpuBackend`.

pub mod burn;

use std::fmt::Debug;

pub use self::burn::{BurnBackend, CpuBackend, NdArrayBackend};

/// Tensor operations required by the compiled solvers.
///
/// Shape mismatches are programming errors and panic. Element-wise
/// operations consume their left operand so implementations can update it
/// in place.
pub trait Backend {
    /// Dense row-major matrix.
    type Dense: Clone + Debug;
    /// Sparse matrix.
    type Sparse: Clone + Debug;

    /// Short name for logs and benchmark labels.
    fn name(&self) -> &'static str;

    /// Dense matrix from row-major data.
    fn dense(&self, rows: usize, cols: usize, data: &[f64]) -> Self::Dense;

    fn full(&self, rows: usize, cols: usize, value: f64) -> Self::Dense;

    fn zeros(&self, rows: usize, cols: usize) -> Self::Dense {
        self.full(rows, cols, 0.0)
    }

    /// Column vector from a slice.
    fn column(&self, data: &[f64]) -> Self::Dense {
        self.dense(data.len(), 1, data)
    }

    fn dims(&self, tensor: &Self::Dense) -> (usize, usize);

    /// Row-major copy of the data on the host.
    fn to_vec(&self, tensor: &Self::Dense) -> Vec<f64>;

    /// Sparse matrix from `(row, col, value)` triplets; duplicates are summed.
    fn sparse(&self, rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> Self::Sparse;

    fn sparse_dims(&self, matrix: &Self::Sparse) -> (usize, usize);

    /// Number of stored entries.
    fn nnz(&self, matrix: &Self::Sparse) -> usize;

    fn transpose(&self, matrix: &Self::Sparse) -> Self::Sparse;

    /// `matrix @ dense`.
    fn matmul(&self, matrix: &Self::Sparse, dense: &Self::Dense) -> Self::Dense;

    /// `matrix[i, j] * scale[j]`, keeping the sparsity pattern.
    fn scale_columns(&self, matrix: &Self::Sparse, scale: &Self::Dense) -> Self::Sparse;

    fn add(&self, lhs: Self::Dense, rhs: &Self::Dense) -> Self::Dense;

    fn sub(&self, lhs: Self::Dense, rhs: &Self::Dense) -> Self::Dense;

    /// Element-wise product.
    fn mul(&self, lhs: Self::Dense, rhs: &Self::Dense) -> Self::Dense;

    fn scale(&self, tensor: Self::Dense, factor: f64) -> Self::Dense;

    fn clamp_min(&self, tensor: Self::Dense, min: f64) -> Self::Dense;

    /// `numerator / denominator`, taking `fallback` wherever the denominator
    /// is zero or the quotient is NaN.
    fn div_or(
        &self,
        numerator: Self::Dense,
        denominator: &Self::Dense,
        fallback: &Self::Dense,
    ) -> Self::Dense;

    /// Repeat an `n x 1` column `cols` times into an `n x cols` matrix.
    fn broadcast_columns(&self, column: &Self::Dense, cols: usize) -> Self::Dense;

    /// Sum over each row into an `n x 1` column.
    fn sum_rows(&self, tensor: &Self::Dense) -> Self::Dense;

    /// Overwrite with `value` wherever `mask` is non-zero.
    fn mask_fill(&self, tensor: Self::Dense, mask: &Self::Dense, value: f64) -> Self::Dense;
}
