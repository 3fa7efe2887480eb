//! Vectorized `f32` primitives behind [`CpuKernel`](crate::CpuKernel).
//!
//! The instruction set is probed once per process. Every primitive dispatches
//! on the cached [`SimdLevel`] and falls back to a scalar loop on CPUs
//! without AVX and on non-x86_64 targets. Inputs are processed in 8-lane
//! blocks with a scalar tail.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

use once_cell::sync::Lazy;

/// Widest instruction set the primitives may use on this CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SimdLevel {
    /// Plain loops.
    Scalar,
    /// 256-bit float arithmetic.
    Avx,
    /// AVX2 with fused multiply-add.
    Avx2Fma,
}

impl SimdLevel {
    /// Probe the running CPU.
    #[cfg(target_arch = "x86_64")]
    pub fn detect() -> Self {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            SimdLevel::Avx2Fma
        } else if is_x86_feature_detected!("avx") {
            SimdLevel::Avx
        } else {
            SimdLevel::Scalar
        }
    }

    /// Probe the running CPU.
    #[cfg(not(target_arch = "x86_64"))]
    pub fn detect() -> Self {
        SimdLevel::Scalar
    }

    /// `f32` values processed per instruction.
    pub fn lanes(self) -> usize {
        match self {
            SimdLevel::Scalar => 1,
            SimdLevel::Avx | SimdLevel::Avx2Fma => LANES,
        }
    }
}

const LANES: usize = 8;

static LEVEL: Lazy<SimdLevel> = Lazy::new(|| {
    let level = SimdLevel::detect();
    tracing::debug!("SIMD level: {:?}", level);
    level
});

/// The cached [`SimdLevel`] of this process.
pub fn simd_level() -> SimdLevel {
    *LEVEL
}

/// `Σ a[i]·b[i]`.
///
/// # Panics
///
/// If the slices differ in length.
#[inline]
pub fn dot_product_f32(a: &[f32], b: &[f32]) -> f32 {
    assert_eq!(a.len(), b.len(), "dot product operands differ in length");

    match simd_level() {
        // SAFETY: the level was detected on this CPU and lengths are equal.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2Fma => unsafe { x86::dot_fma(a, b) },
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx => unsafe { x86::dot_avx(a, b) },
        _ => a.iter().zip(b).map(|(x, y)| x * y).sum(),
    }
}

/// `out[i] = a[i] + b[i]`.
///
/// # Panics
///
/// If the three slices differ in length.
#[inline]
pub fn add_f32(a: &[f32], b: &[f32], out: &mut [f32]) {
    assert!(
        a.len() == b.len() && a.len() == out.len(),
        "add operands differ in length"
    );

    match simd_level() {
        // SAFETY: AVX is available and lengths are equal.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx | SimdLevel::Avx2Fma => unsafe { x86::add_avx(a, b, out) },
        _ => {
            for ((o, x), y) in out.iter_mut().zip(a).zip(b) {
                *o = x + y;
            }
        }
    }
}

/// `y[i] += alpha · x[i]`, one row step of a vector-matrix product.
///
/// # Panics
///
/// If the slices differ in length.
#[inline]
pub fn axpy_f32(alpha: f32, x: &[f32], y: &mut [f32]) {
    assert_eq!(x.len(), y.len(), "axpy operands differ in length");

    match simd_level() {
        // SAFETY: AVX2+FMA is available and lengths are equal.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx2Fma => unsafe { x86::axpy_fma(alpha, x, y) },
        _ => {
            for (yi, xi) in y.iter_mut().zip(x) {
                *yi += alpha * xi;
            }
        }
    }
}

/// `data[i] = max(data[i], 0)` in place.
#[inline]
pub fn relu_f32_inplace(data: &mut [f32]) {
    match simd_level() {
        // SAFETY: AVX is available.
        #[cfg(target_arch = "x86_64")]
        SimdLevel::Avx | SimdLevel::Avx2Fma => unsafe { x86::relu_avx(data) },
        _ => data.iter_mut().for_each(|v| *v = v.max(0.0)),
    }
}

#[cfg(target_arch = "x86_64")]
mod x86 {
    //! Callers must have confirmed the named target features at runtime.

    use super::*;

    #[target_feature(enable = "avx")]
    pub(super) unsafe fn dot_avx(a: &[f32], b: &[f32]) -> f32 {
        let mut acc = _mm256_setzero_ps();
        let blocks = a.chunks_exact(LANES).zip(b.chunks_exact(LANES));
        for (xa, xb) in blocks {
            let prod = _mm256_mul_ps(_mm256_loadu_ps(xa.as_ptr()), _mm256_loadu_ps(xb.as_ptr()));
            acc = _mm256_add_ps(acc, prod);
        }
        let tail = a.len() - a.len() % LANES;
        reduce(acc) + dot_tail(&a[tail..], &b[tail..])
    }

    #[target_feature(enable = "avx2,fma")]
    pub(super) unsafe fn dot_fma(a: &[f32], b: &[f32]) -> f32 {
        let mut acc = _mm256_setzero_ps();
        let blocks = a.chunks_exact(LANES).zip(b.chunks_exact(LANES));
        for (xa, xb) in blocks {
            acc = _mm256_fmadd_ps(_mm256_loadu_ps(xa.as_ptr()), _mm256_loadu_ps(xb.as_ptr()), acc);
        }
        let tail = a.len() - a.len() % LANES;
        reduce(acc) + dot_tail(&a[tail..], &b[tail..])
    }

    fn dot_tail(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    /// Horizontal sum of the eight lanes.
    #[target_feature(enable = "avx")]
    unsafe fn reduce(v: __m256) -> f32 {
        let quad = _mm_add_ps(_mm256_castps256_ps128(v), _mm256_extractf128_ps(v, 1));
        let pair = _mm_add_ps(quad, _mm_movehl_ps(quad, quad));
        _mm_cvtss_f32(_mm_add_ss(pair, _mm_shuffle_ps(pair, pair, 0b01)))
    }

    #[target_feature(enable = "avx")]
    pub(super) unsafe fn add_avx(a: &[f32], b: &[f32], out: &mut [f32]) {
        let mut out_blocks = out.chunks_exact_mut(LANES);
        for ((xa, xb), o) in a
            .chunks_exact(LANES)
            .zip(b.chunks_exact(LANES))
            .zip(&mut out_blocks)
        {
            let sum = _mm256_add_ps(_mm256_loadu_ps(xa.as_ptr()), _mm256_loadu_ps(xb.as_ptr()));
            _mm256_storeu_ps(o.as_mut_ptr(), sum);
        }
        let tail = a.len() - a.len() % LANES;
        for ((o, x), y) in out_blocks
            .into_remainder()
            .iter_mut()
            .zip(&a[tail..])
            .zip(&b[tail..])
        {
            *o = x + y;
        }
    }

    #[target_feature(enable = "avx2,fma")]
    pub(super) unsafe fn axpy_fma(alpha: f32, x: &[f32], y: &mut [f32]) {
        let scale = _mm256_set1_ps(alpha);
        let mut y_blocks = y.chunks_exact_mut(LANES);
        for (xb, yb) in x.chunks_exact(LANES).zip(&mut y_blocks) {
            let acc = _mm256_fmadd_ps(scale, _mm256_loadu_ps(xb.as_ptr()), _mm256_loadu_ps(yb.as_ptr()));
            _mm256_storeu_ps(yb.as_mut_ptr(), acc);
        }
        let tail = x.len() - x.len() % LANES;
        for (yi, xi) in y_blocks.into_remainder().iter_mut().zip(&x[tail..]) {
            *yi += alpha * xi;
        }
    }

    #[target_feature(enable = "avx")]
    pub(super) unsafe fn relu_avx(data: &mut [f32]) {
        let zero = _mm256_setzero_ps();
        let mut blocks = data.chunks_exact_mut(LANES);
        for block in &mut blocks {
            let v = _mm256_loadu_ps(block.as_ptr());
            _mm256_storeu_ps(block.as_mut_ptr(), _mm256_max_ps(v, zero));
        }
        for v in blocks.into_remainder() {
            *v = v.max(0.0);
        }
    }
}
