//! Matrix kernels used by compute units.
//!
//! Units never do their own linear algebra; they describe the product they
//! need with a [`MatMulShape`] and hand the slices to a [`MathKernel`]. The
//! default [`CpuKernel`] is built on the primitives in [`crate::simd`].

use std::fmt;

use crate::error::{CoreError, Result};
use crate::simd::{add_f32, axpy_f32, dot_product_f32};

/// Dimensions of `out = a · op(b)` for row-major operands.
///
/// `a` is `rows × inner` and `out` is `rows × cols`. When `transpose_b` is
/// false, `b` is stored `inner × cols`; when true, `b` is stored
/// `cols × inner` and used transposed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatMulShape {
    /// Rows of `a` and of the result.
    pub rows: usize,
    /// Shared dimension.
    pub inner: usize,
    /// Columns of the result.
    pub cols: usize,
    /// Whether `b` is stored transposed.
    pub transpose_b: bool,
}

impl MatMulShape {
    /// Row vector (`1 × inner`) times an `inner × cols` matrix.
    pub fn row_vector(inner: usize, cols: usize) -> Self {
        Self {
            rows: 1,
            inner,
            cols,
            transpose_b: false,
        }
    }

    /// Same product with `b` stored transposed.
    pub fn transposed(mut self) -> Self {
        self.transpose_b = true;
        self
    }

    fn check(&self, a: &[f32], b: &[f32], out: &[f32]) -> Result<()> {
        let a_len = self.rows * self.inner;
        let b_len = self.inner * self.cols;
        let out_len = self.rows * self.cols;
        if a.len() != a_len {
            return Err(CoreError::dimension_mismatch("matmul lhs", a_len, a.len()));
        }
        if b.len() != b_len {
            return Err(CoreError::dimension_mismatch("matmul rhs", b_len, b.len()));
        }
        if out.len() != out_len {
            return Err(CoreError::dimension_mismatch("matmul output", out_len, out.len()));
        }
        Ok(())
    }
}

/// Matrix primitives over contiguous row-major `f32` buffers.
///
/// Implementations must check slice lengths and report
/// [`CoreError::DimensionMismatch`] rather than panic or read out of bounds.
pub trait MathKernel: Send + Sync + fmt::Debug {
    /// Human-readable backend name, used in logs.
    fn name(&self) -> &str;

    /// `out = a · op(b)` with dimensions given by `shape`.
    fn matrix_multiply(&self, a: &[f32], b: &[f32], shape: MatMulShape, out: &mut [f32])
        -> Result<()>;

    /// Elementwise `out = a + b` over `rows × cols` matrices.
    fn matrix_add(
        &self,
        a: &[f32],
        b: &[f32],
        rows: usize,
        cols: usize,
        out: &mut [f32],
    ) -> Result<()>;
}

/// SIMD-accelerated CPU implementation of [`MathKernel`].
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuKernel;

impl CpuKernel {
    /// Create a CPU kernel.
    pub fn new() -> Self {
        Self
    }
}

impl MathKernel for CpuKernel {
    fn name(&self) -> &str {
        "cpu"
    }

    fn matrix_multiply(
        &self,
        a: &[f32],
        b: &[f32],
        shape: MatMulShape,
        out: &mut [f32],
    ) -> Result<()> {
        shape.check(a, b, out)?;
        let MatMulShape {
            rows, inner, cols, ..
        } = shape;

        if shape.transpose_b {
            // Each output element is a dot product of two contiguous rows.
            for r in 0..rows {
                let a_row = &a[r * inner..(r + 1) * inner];
                for c in 0..cols {
                    out[r * cols + c] = dot_product_f32(a_row, &b[c * inner..(c + 1) * inner]);
                }
            }
        } else {
            // Accumulate scaled rows of b so every access stays contiguous.
            for r in 0..rows {
                let out_row = &mut out[r * cols..(r + 1) * cols];
                out_row.fill(0.0);
                for k in 0..inner {
                    axpy_f32(a[r * inner + k], &b[k * cols..(k + 1) * cols], out_row);
                }
            }
        }
        Ok(())
    }

    fn matrix_add(
        &self,
        a: &[f32],
        b: &[f32],
        rows: usize,
        cols: usize,
        out: &mut [f32],
    ) -> Result<()> {
        let len = rows * cols;
        for (context, actual) in [("add lhs", a.len()), ("add rhs", b.len()), ("add output", out.len())] {
            if actual != len {
                return Err(CoreError::dimension_mismatch(context, len, actual));
            }
        }
        add_f32(a, b, out);
        Ok(())
    }
}
