//! [`Backend`] over `burn` tensors.
//!
//! Dense matrices are `Tensor<B, 2>` in the backend's float precision. Sparse
//! matrices are COO index tensors; a sparse-times-dense product gathers the
//! referenced rows of the dense operand (`select`), weights them by the
//! stored values and scatter-adds them into the output rows (`select_assign`).

// Host indices cross the usize/i64 boundary here.
#![allow(clippy::cast_possible_wrap)]

use ::burn::backend::ndarray::{NdArray, NdArrayDevice};
#[cfg(feature = "gpu")]
use ::burn::backend::wgpu::{Wgpu, WgpuDevice};
use ::burn::tensor::backend::Backend as TensorBackend;
use ::burn::tensor::{Int, Tensor, TensorData};

use super::Backend;

/// COO sparse matrix living on a `burn` device.
#[derive(Debug, Clone)]
pub struct CooMatrix<B: TensorBackend> {
    pub rows: usize,
    pub cols: usize,
    pub nnz: usize,
    pub row_indices: Tensor<B, 1, Int>,
    pub col_indices: Tensor<B, 1, Int>,
    pub values: Tensor<B, 1>,
}

/// [`Backend`] implementation over any `burn` tensor backend.
#[derive(Debug, Clone)]
pub struct BurnBackend<B: TensorBackend> {
    device: B::Device,
    name: &'static str,
}

/// Double-precision ndarray on the CPU; the reference backend.
pub type CpuBackend = BurnBackend<NdArray<f64>>;

/// Single-precision ndarray on the CPU.
pub type NdArrayBackend = BurnBackend<NdArray<f32>>;

/// `burn` on the GPU through WGPU (Metal, Vulkan or DX12).
#[cfg(feature = "gpu")]
pub type WgpuBackend = BurnBackend<Wgpu>;

impl<B: TensorBackend> BurnBackend<B> {
    #[must_use]
    pub fn new(device: B::Device, name: &'static str) -> Self {
        Self { device, name }
    }

    #[must_use]
    pub fn device(&self) -> &B::Device {
        &self.device
    }

    fn floats(&self, data: &[f64], shape: [usize; 2]) -> Tensor<B, 2> {
        Tensor::from_data(TensorData::new(data.to_vec(), shape), &self.device)
    }

    fn ints(&self, data: impl Iterator<Item = usize>) -> Tensor<B, 1, Int> {
        let data: Vec<i64> = data.map(|x| x as i64).collect();
        let len = data.len();
        Tensor::from_data(TensorData::new(data, [len]), &self.device)
    }
}

impl CpuBackend {
    #[must_use]
    pub fn cpu() -> Self {
        Self::new(NdArrayDevice::Cpu, "ndarray-f64")
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::cpu()
    }
}

impl NdArrayBackend {
    #[must_use]
    pub fn ndarray() -> Self {
        Self::new(NdArrayDevice::Cpu, "ndarray-f32")
    }
}

#[cfg(feature = "gpu")]
impl WgpuBackend {
    #[must_use]
    pub fn wgpu() -> Self {
        Self::new(WgpuDevice::default(), "wgpu")
    }
}

impl<B: TensorBackend> Backend for BurnBackend<B> {
    type Dense = Tensor<B, 2>;
    type Sparse = CooMatrix<B>;

    fn name(&self) -> &'static str {
        self.name
    }

    fn dense(&self, rows: usize, cols: usize, data: &[f64]) -> Tensor<B, 2> {
        assert_eq!(data.len(), rows * cols, "dense data does not fill {rows}x{cols}");
        if data.is_empty() {
            return Tensor::zeros([rows, cols], &self.device);
        }
        self.floats(data, [rows, cols])
    }

    fn full(&self, rows: usize, cols: usize, value: f64) -> Tensor<B, 2> {
        Tensor::full([rows, cols], value, &self.device)
    }

    fn dims(&self, tensor: &Tensor<B, 2>) -> (usize, usize) {
        let [rows, cols] = tensor.dims();
        (rows, cols)
    }

    fn to_vec(&self, tensor: &Tensor<B, 2>) -> Vec<f64> {
        tensor.to_data().iter::<f64>().collect()
    }

    fn sparse(&self, rows: usize, cols: usize, triplets: &[(usize, usize, f64)]) -> CooMatrix<B> {
        for &(r, c, _) in triplets {
            assert!(r < rows && c < cols, "triplet ({r}, {c}) outside {rows}x{cols}");
        }
        let values: Vec<f64> = triplets.iter().map(|t| t.2).collect();
        let nnz = triplets.len();
        CooMatrix {
            rows,
            cols,
            nnz,
            row_indices: self.ints(triplets.iter().map(|t| t.0)),
            col_indices: self.ints(triplets.iter().map(|t| t.1)),
            values: Tensor::from_data(TensorData::new(values, [nnz]), &self.device),
        }
    }

    fn sparse_dims(&self, matrix: &CooMatrix<B>) -> (usize, usize) {
        (matrix.rows, matrix.cols)
    }

    fn nnz(&self, matrix: &CooMatrix<B>) -> usize {
        matrix.nnz
    }

    fn transpose(&self, matrix: &CooMatrix<B>) -> CooMatrix<B> {
        CooMatrix {
            rows: matrix.cols,
            cols: matrix.rows,
            nnz: matrix.nnz,
            row_indices: matrix.col_indices.clone(),
            col_indices: matrix.row_indices.clone(),
            values: matrix.values.clone(),
        }
    }

    fn matmul(&self, matrix: &CooMatrix<B>, dense: &Tensor<B, 2>) -> Tensor<B, 2> {
        let [rows, k] = dense.dims();
        assert_eq!(
            matrix.cols, rows,
            "matmul shape mismatch: {}x{} @ {}x{}",
            matrix.rows, matrix.cols, rows, k
        );
        let out = Tensor::zeros([matrix.rows, k], &self.device);
        if matrix.nnz == 0 || k == 0 {
            return out;
        }
        let gathered = dense.clone().select(0, matrix.col_indices.clone());
        let weights = matrix
            .values
            .clone()
            .reshape([matrix.nnz, 1])
            .expand([matrix.nnz, k]);
        out.select_assign(0, matrix.row_indices.clone(), gathered.mul(weights))
    }

    fn scale_columns(&self, matrix: &CooMatrix<B>, scale: &Tensor<B, 2>) -> CooMatrix<B> {
        let [rows, cols] = scale.dims();
        assert!(
            cols == 1 && rows == matrix.cols,
            "column scale must be {}x1, got {rows}x{cols}",
            matrix.cols
        );
        let mut scaled = matrix.clone();
        if matrix.nnz > 0 {
            let factors = scale.clone().reshape([rows]).select(0, matrix.col_indices.clone());
            scaled.values = matrix.values.clone().mul(factors);
        }
        scaled
    }

    fn add(&self, lhs: Tensor<B, 2>, rhs: &Tensor<B, 2>) -> Tensor<B, 2> {
        lhs.add(rhs.clone())
    }

    fn sub(&self, lhs: Tensor<B, 2>, rhs: &Tensor<B, 2>) -> Tensor<B, 2> {
        lhs.sub(rhs.clone())
    }

    fn mul(&self, lhs: Tensor<B, 2>, rhs: &Tensor<B, 2>) -> Tensor<B, 2> {
        lhs.mul(rhs.clone())
    }

    fn scale(&self, tensor: Tensor<B, 2>, factor: f64) -> Tensor<B, 2> {
        tensor.mul_scalar(factor)
    }

    fn clamp_min(&self, tensor: Tensor<B, 2>, min: f64) -> Tensor<B, 2> {
        tensor.clamp_min(min)
    }

    fn div_or(
        &self,
        numerator: Tensor<B, 2>,
        denominator: &Tensor<B, 2>,
        fallback: &Tensor<B, 2>,
    ) -> Tensor<B, 2> {
        let zero = denominator.clone().equal_elem(0.0);
        let quotient = numerator
            .div(denominator.clone())
            .mask_where(zero, fallback.clone());
        let nan = quotient.clone().is_nan();
        quotient.mask_where(nan, fallback.clone())
    }

    fn broadcast_columns(&self, column: &Tensor<B, 2>, cols: usize) -> Tensor<B, 2> {
        let [rows, width] = column.dims();
        assert_eq!(width, 1, "broadcast source must be a column");
        if cols == 0 {
            return Tensor::zeros([rows, 0], &self.device);
        }
        Tensor::cat(vec![column.clone(); cols], 1)
    }

    fn sum_rows(&self, tensor: &Tensor<B, 2>) -> Tensor<B, 2> {
        let [rows, cols] = tensor.dims();
        if cols == 0 {
            return Tensor::zeros([rows, 1], &self.device);
        }
        tensor.clone().sum_dim(1)
    }

    fn mask_fill(&self, tensor: Tensor<B, 2>, mask: &Tensor<B, 2>, value: f64) -> Tensor<B, 2> {
        tensor.mask_fill(mask.clone().not_equal_elem(0.0), value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_macros::timed_test;

    fn approx(actual: &[f64], expected: &[f64], tolerance: f64) {
        assert_eq!(actual.len(), expected.len(), "length mismatch");
        for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
            assert!((a - e).abs() < tolerance, "entry {i}: {a} vs {e}");
        }
    }

    /// Row-major dense copy of a sparse matrix.
    fn densify<B: Backend>(backend: &B, matrix: &B::Sparse) -> Vec<f64> {
        let (_, cols) = backend.sparse_dims(matrix);
        let mut identity = vec![0.0; cols * cols];
        for i in 0..cols {
            identity[i * cols + i] = 1.0;
        }
        backend.to_vec(&backend.matmul(matrix, &backend.dense(cols, cols, &identity)))
    }

    #[timed_test(10)]
    fn matmul_scatter_adds_duplicates() {
        let cpu = CpuBackend::cpu();
        // [[2, 0, 2], [0, 3, 0]] @ [[1, 2], [3, 4], [5, 6]], with (0, 0) split in two
        let m = cpu.sparse(2, 3, &[(0, 0, 1.0), (0, 2, 2.0), (1, 1, 3.0), (0, 0, 1.0)]);
        let x = cpu.dense(3, 2, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let y = cpu.matmul(&m, &x);
        assert_eq!(cpu.dims(&y), (2, 2));
        assert_eq!(cpu.to_vec(&y), vec![12.0, 16.0, 9.0, 12.0]);
        assert_eq!(cpu.nnz(&m), 4);
    }

    #[timed_test(10)]
    fn transpose_swaps_entries() {
        let cpu = CpuBackend::cpu();
        let m = cpu.sparse(2, 3, &[(0, 2, 7.0), (1, 0, 1.0)]);
        let t = cpu.transpose(&m);
        assert_eq!(cpu.sparse_dims(&t), (3, 2));
        assert_eq!(densify(&cpu, &t), vec![0.0, 1.0, 0.0, 0.0, 7.0, 0.0]);
    }

    #[timed_test(10)]
    fn scale_columns_keeps_pattern() {
        let cpu = CpuBackend::cpu();
        let m = cpu.sparse(2, 2, &[(0, 0, 1.0), (0, 1, 1.0), (1, 1, 2.0)]);
        let scaled = cpu.scale_columns(&m, &cpu.column(&[10.0, 0.5]));
        assert_eq!(cpu.nnz(&scaled), 3);
        assert_eq!(densify(&cpu, &scaled), vec![10.0, 0.5, 0.0, 1.0]);
    }

    #[timed_test(10)]
    fn div_or_falls_back_on_zero_and_nan() {
        let cpu = CpuBackend::cpu();
        let num = cpu.column(&[1.0, 0.0, 3.0, f64::NAN]);
        let den = cpu.column(&[2.0, 0.0, 0.0, 1.0]);
        let fallback = cpu.column(&[-1.0, -2.0, -3.0, -4.0]);
        assert_eq!(cpu.to_vec(&cpu.div_or(num, &den, &fallback)), vec![0.5, -2.0, -3.0, -4.0]);
    }

    #[timed_test(10)]
    fn broadcast_mask_and_row_sums() {
        let cpu = CpuBackend::cpu();
        let wide = cpu.broadcast_columns(&cpu.column(&[0.25, 0.5]), 3);
        assert_eq!(cpu.to_vec(&wide), vec![0.25, 0.25, 0.25, 0.5, 0.5, 0.5]);

        let mask = cpu.dense(2, 3, &[0.0, 1.0, 0.0, 0.0, 0.0, 1.0]);
        let filled = cpu.mask_fill(wide, &mask, 1.0);
        assert_eq!(cpu.to_vec(&filled), vec![0.25, 1.0, 0.25, 0.5, 0.5, 1.0]);
        assert_eq!(cpu.to_vec(&cpu.sum_rows(&filled)), vec![1.5, 2.0]);
        assert_eq!(cpu.to_vec(&cpu.sum_rows(&cpu.zeros(2, 0))), vec![0.0, 0.0]);
    }

    #[timed_test(10)]
    fn elementwise_ops() {
        let cpu = CpuBackend::cpu();
        let a = cpu.column(&[1.0, -2.0, 3.0]);
        let b = cpu.column(&[0.5, 0.5, -1.0]);
        assert_eq!(cpu.to_vec(&cpu.add(a.clone(), &b)), vec![1.5, -1.5, 2.0]);
        assert_eq!(cpu.to_vec(&cpu.sub(a.clone(), &b)), vec![0.5, -2.5, 4.0]);
        assert_eq!(cpu.to_vec(&cpu.mul(a.clone(), &b)), vec![0.5, -1.0, -3.0]);
        assert_eq!(cpu.to_vec(&cpu.scale(a.clone(), 2.0)), vec![2.0, -4.0, 6.0]);
        assert_eq!(cpu.to_vec(&cpu.clamp_min(a, 0.0)), vec![1.0, 0.0, 3.0]);
    }

    #[timed_test(10)]
    fn keeps_double_precision() {
        let cpu = CpuBackend::cpu();
        let tiny = 1.0 + 1e-12;
        assert_eq!(cpu.to_vec(&cpu.column(&[tiny])), vec![tiny]);
    }

    #[timed_test(10)]
    fn single_precision_agrees_within_rounding() {
        let cpu = CpuBackend::cpu();
        let f32s = NdArrayBackend::ndarray();
        let triplets = [(0, 1, 0.5), (1, 0, 2.0), (2, 2, -1.0), (2, 0, 1.0)];
        let data = [1.0, 0.0, -2.0, 4.0, 0.5, 0.0];
        let scale = [2.0, 0.0, 1.0];

        let (mc, mf) = (cpu.sparse(3, 3, &triplets), f32s.sparse(3, 3, &triplets));
        let (xc, xf) = (cpu.dense(3, 2, &data), f32s.dense(3, 2, &data));
        let (sc, sf) = (cpu.column(&scale), f32s.column(&scale));

        let yc = cpu.matmul(&cpu.transpose(&cpu.scale_columns(&mc, &sc)), &xc);
        let yf = f32s.matmul(&f32s.transpose(&f32s.scale_columns(&mf, &sf)), &xf);
        approx(&f32s.to_vec(&yf), &cpu.to_vec(&yc), 1e-5);

        let qc = cpu.div_or(xc, &cpu.broadcast_columns(&sc, 2), &cpu.full(3, 2, 9.0));
        let qf = f32s.div_or(xf, &f32s.broadcast_columns(&sf, 2), &f32s.full(3, 2, 9.0));
        approx(&f32s.to_vec(&qf), &cpu.to_vec(&qc), 1e-5);
    }

    #[timed_test(10)]
    #[should_panic(expected = "matmul shape mismatch")]
    fn matmul_rejects_bad_shapes() {
        let cpu = CpuBackend::cpu();
        let m = cpu.sparse(2, 3, &[]);
        let _ = cpu.matmul(&m, &cpu.zeros(2, 1));
    }
}
