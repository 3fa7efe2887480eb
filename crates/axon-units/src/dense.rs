//! Fully connected ("all to all") unit: affine transform plus activation.
//!
//! For input size I and output size O the unit holds `weights` as a row-major
//! I×O matrix and `bias` of length O, and computes
//!
//! ```text
//! output[j] = f(Σ_i input[i] · weights[i·O + j] + bias[j])
//! ```

use std::sync::Arc;

use axon_core::{
    global_pool, BufferPool, CoreError, CpuKernel, MatMulShape, MathKernel, ParameterKind,
    ParameterPolicy, ParameterValue, Result,
};
use tracing::{debug, trace};

use crate::activation::Activation;
use crate::attribute::AttributeBinder;
use crate::unit::{positive_size, ComputeUnit};

/// Configurable state of a [`DenseUnit`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DenseParameters {
    weights: Option<Vec<f32>>,
    bias: Option<Vec<f32>>,
    weights_length: Option<usize>,
    bias_length: Option<usize>,
    activation: Activation,
}

impl DenseParameters {
    /// Weights as supplied, if any.
    pub fn weights(&self) -> Option<&[f32]> {
        self.weights.as_deref()
    }

    /// Bias as supplied, if any.
    pub fn bias(&self) -> Option<&[f32]> {
        self.bias.as_deref()
    }

    /// The activation applied after the affine transform.
    pub fn activation(&self) -> Activation {
        self.activation
    }

    fn weights_len(&self) -> Option<usize> {
        self.weights.as_ref().map(Vec::len).or(self.weights_length)
    }

    fn bias_len(&self) -> Option<usize> {
        self.bias.as_ref().map(Vec::len).or(self.bias_length)
    }

    fn set_weights(&mut self, value: ParameterValue) -> Result<()> {
        let weights = value.into_floats("weights")?;
        if weights.is_empty() {
            return Err(CoreError::Configuration("weights must not be empty".into()));
        }
        check_declared("weights", self.weights_length, weights.len())?;
        check_shape(weights.len(), self.bias_len())?;
        self.weights = Some(weights);
        Ok(())
    }

    fn set_bias(&mut self, value: ParameterValue) -> Result<()> {
        let bias = value.into_floats("bias")?;
        if bias.is_empty() {
            return Err(CoreError::Configuration("bias must not be empty".into()));
        }
        check_declared("bias", self.bias_length, bias.len())?;
        if let Some(weights_len) = self.weights_len() {
            check_shape(weights_len, Some(bias.len()))?;
        }
        self.bias = Some(bias);
        Ok(())
    }

    // A new declared length discards any stored buffer it no longer
    // describes; the unit stays unconfigured until a matching one arrives.
    fn set_weights_length(&mut self, value: ParameterValue) -> Result<()> {
        let length = positive_size(value, "weights_length")?;
        check_shape(length, self.bias_length)?;
        self.weights_length = Some(length);
        if self.weights.as_ref().is_some_and(|w| w.len() != length) {
            debug!("Dropping weights: weights_length is now {}", length);
            self.weights = None;
        }
        if self.bias.as_ref().is_some_and(|b| length % b.len() != 0) {
            debug!("Dropping bias: {} weights do not form whole rows", length);
            self.bias = None;
        }
        Ok(())
    }

    fn set_bias_length(&mut self, value: ParameterValue) -> Result<()> {
        let length = positive_size(value, "bias_length")?;
        if let Some(weights_length) = self.weights_length {
            check_shape(weights_length, Some(length))?;
        }
        self.bias_length = Some(length);
        if self.bias.as_ref().is_some_and(|b| b.len() != length) {
            debug!("Dropping bias: bias_length is now {}", length);
            self.bias = None;
        }
        if self.weights.as_ref().is_some_and(|w| w.len() % length != 0) {
            debug!("Dropping weights: not a multiple of bias_length {}", length);
            self.weights = None;
        }
        Ok(())
    }

    fn set_activation(&mut self, value: ParameterValue) -> Result<()> {
        self.activation = value.into_text("activation")?.parse()?;
        Ok(())
    }
}

/// An explicit length must agree with the buffer it describes.
fn check_declared(name: &str, declared: Option<usize>, actual: usize) -> Result<()> {
    match declared {
        Some(expected) if expected != actual => {
            Err(CoreError::dimension_mismatch(format!("{name} length"), expected, actual))
        }
        _ => Ok(()),
    }
}

/// Weights must hold a whole number of bias-length rows.
fn check_shape(weights_len: usize, bias_len: Option<usize>) -> Result<()> {
    match bias_len {
        Some(bias_len) if weights_len % bias_len != 0 => Err(CoreError::Configuration(format!(
            "weights length {weights_len} is not a multiple of bias length {bias_len}"
        ))),
        _ => Ok(()),
    }
}

fn dense_binder() -> AttributeBinder<DenseParameters> {
    AttributeBinder::new("all2all")
        .bind("weights", ParameterKind::Floats, DenseParameters::set_weights)
        .bind("bias", ParameterKind::Floats, DenseParameters::set_bias)
        .bind(
            "weights_length",
            ParameterKind::Size,
            DenseParameters::set_weights_length,
        )
        .bind("bias_length", ParameterKind::Size, DenseParameters::set_bias_length)
        .bind("activation", ParameterKind::Text, DenseParameters::set_activation)
}

/// Dense layer: `f(input · weights + bias)`.
///
/// The affine result is staged in a scratch buffer borrowed from the unit's
/// [`BufferPool`] for the duration of one `execute` call.
#[derive(Debug, Clone)]
pub struct DenseUnit {
    params: DenseParameters,
    binder: AttributeBinder<DenseParameters>,
    kernel: Arc<dyn MathKernel>,
    pool: Arc<BufferPool>,
}

impl DenseUnit {
    /// Create an unconfigured dense unit with the given activation.
    pub fn new(activation: Activation) -> Self {
        Self {
            params: DenseParameters {
                activation,
                ..Default::default()
            },
            binder: dense_binder(),
            kernel: Arc::new(CpuKernel::new()),
            pool: global_pool(),
        }
    }

    /// Use a different math backend.
    pub fn with_kernel(mut self, kernel: Arc<dyn MathKernel>) -> Self {
        self.kernel = kernel;
        self
    }

    /// Draw scratch buffers from `pool` instead of the global pool.
    pub fn with_pool(mut self, pool: Arc<BufferPool>) -> Self {
        self.pool = pool;
        self
    }

    /// Current parameters.
    pub fn parameters(&self) -> &DenseParameters {
        &self.params
    }

    /// Names this unit accepts in `set_parameter`.
    pub fn parameter_names(&self) -> Vec<&'static str> {
        self.binder.names()
    }

    fn configured(&self) -> Result<(&[f32], &[f32])> {
        let weights = self
            .params
            .weights
            .as_deref()
            .ok_or_else(|| CoreError::not_configured(self.kind(), "weights"))?;
        let bias = self
            .params
            .bias
            .as_deref()
            .ok_or_else(|| CoreError::not_configured(self.kind(), "bias"))?;
        Ok((weights, bias))
    }
}

impl Default for DenseUnit {
    fn default() -> Self {
        Self::new(Activation::Identity)
    }
}

impl ComputeUnit for DenseUnit {
    fn kind(&self) -> &str {
        match self.params.activation {
            Activation::Identity => "all2all",
            Activation::Tanh => "all2all_tanh",
            Activation::ScaledTanh => "all2all_scaled_tanh",
            Activation::Sigmoid => "all2all_sigmoid",
            Activation::Relu => "all2all_relu",
            Activation::Softplus => "all2all_softplus",
            Activation::Log => "all2all_log",
        }
    }

    fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<()> {
        self.binder.dispatch(&mut self.params, name, value)
    }

    fn parameter_policy(&self) -> ParameterPolicy {
        self.binder.policy()
    }

    fn set_parameter_policy(&mut self, policy: ParameterPolicy) {
        self.binder.set_policy(policy);
    }

    fn input_size(&self) -> Option<usize> {
        Some(self.params.weights_len()? / self.params.bias_len()?)
    }

    fn output_size(&self) -> Option<usize> {
        self.params.bias_len()
    }

    fn missing_parameter(&self) -> Option<&'static str> {
        if self.params.weights.is_none() {
            Some("weights")
        } else if self.params.bias.is_none() {
            Some("bias")
        } else {
            None
        }
    }

    fn execute(&self, input: &[f32], output: &mut [f32]) -> Result<()> {
        let (weights, bias) = self.configured()?;
        self.check_io(input, output)?;
        let output_count = bias.len();
        let input_count = weights.len() / output_count;
        trace!(
            "Executing {} ({} -> {}) on {}",
            self.kind(),
            input_count,
            output_count,
            self.kernel.name()
        );

        let mut affine = self.pool.acquire(output_count);
        self.kernel.matrix_multiply(
            input,
            weights,
            MatMulShape::row_vector(input_count, output_count),
            &mut affine,
        )?;
        self.kernel
            .matrix_add(&affine, bias, 1, output_count, output)?;
        self.params.activation.apply_slice(output);
        Ok(())
    }
}
