//! Axon compute units
//!
//! A unit is one stage of a forward pass. Every unit implements
//! [`ComputeUnit`]: it is configured through named, type-tagged parameters
//! and then executed over caller-owned `f32` buffers.
//!
//! Built-in kinds:
//! - [`DenseUnit`]: `f(input · weights + bias)`, the "all to all" layer
//! - [`ActivationUnit`]: standalone elementwise activation
//! - [`SoftmaxUnit`]: probability normalisation
//! - [`DropoutUnit`]: inference-time dropout (identity)
//!
//! [`UnitRegistry`] constructs any of them from a kind identifier.
//!
//! ## Example
//!
//! ```rust
//! use axon_units::{Activation, ComputeUnit, DenseUnit};
//!
//! let mut unit = DenseUnit::new(Activation::Identity);
//! unit.set_parameter("weights", vec![1.0, 0.0, 0.0, 1.0].into())?;
//! unit.set_parameter("bias", vec![0.0, 0.0].into())?;
//!
//! let mut output = [0.0f32; 2];
//! unit.execute(&[3.0, -1.5], &mut output)?;
//! assert_eq!(output, [3.0, -1.5]);
//! # Ok::<(), axon_core::CoreError>(())
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod activation;
pub mod attribute;
pub mod dense;
pub mod dropout;
pub mod elementwise;
pub mod registry;
pub mod softmax;
pub mod unit;

pub use activation::Activation;
pub use attribute::{AttributeBinder, Setter};
pub use dense::{DenseParameters, DenseUnit};
pub use dropout::DropoutUnit;
pub use elementwise::ActivationUnit;
pub use registry::{UnitFactory, UnitRegistry};
pub use softmax::SoftmaxUnit;
pub use unit::ComputeUnit;
