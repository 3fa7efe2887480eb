//! Axon core runtime primitives
//!
//! Foundation shared by every Axon compute unit:
//! - **Error**: the [`CoreError`] taxonomy and [`Result`] alias
//! - **Parameters**: tagged [`ParameterValue`]s crossing the configuration boundary
//! - **Kernels**: the [`MathKernel`] seam and its SIMD-backed [`CpuKernel`]
//! - **Memory**: the [`BufferPool`] for per-call scratch buffers
//! - **Logging**: `tracing-subscriber` setup
//!
//! ## Example
//!
//! ```rust
//! use axon_core::{CpuKernel, MatMulShape, MathKernel};
//!
//! let kernel = CpuKernel::new();
//! let mut out = [0.0f32; 2];
//! kernel.matrix_multiply(&[1.0, 1.0], &[1.0, 2.0, 3.0, 4.0], MatMulShape::row_vector(2, 2), &mut out)?;
//! assert_eq!(out, [4.0, 6.0]);
//! # Ok::<(), axon_core::CoreError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod kernel;
pub mod logging;
pub mod memory_pool;
pub mod parameter;
pub mod simd;

pub use error::{CoreError, Result};
pub use kernel::{CpuKernel, MatMulShape, MathKernel};
pub use memory_pool::{global_pool, BufferPool, PoolConfig, PoolStats, PooledBuffer};
pub use parameter::{ParameterKind, ParameterPolicy, ParameterValue};
pub use simd::{simd_level, SimdLevel};
