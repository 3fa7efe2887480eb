//! Dropout unit for inference.
//!
//! Dropout is trained with inverted scaling: kept activations are multiplied
//! by `1 / (1 - ratio)` during training, so the inference-time forward pass is
//! the identity. The unit still accepts and validates `dropout_ratio` so a
//! training-time topology can be loaded unchanged.

use axon_core::{CoreError, ParameterKind, ParameterPolicy, ParameterValue, Result};

use crate::attribute::AttributeBinder;
use crate::unit::{positive_size, ComputeUnit};

#[derive(Debug, Clone, Default, PartialEq)]
struct DropoutParameters {
    length: Option<usize>,
    dropout_ratio: Option<f32>,
}

fn set_ratio(p: &mut DropoutParameters, value: ParameterValue) -> Result<()> {
    let ratio = value.into_scalar("dropout_ratio")?;
    if !(ratio > 0.0 && ratio < 1.0) {
        return Err(CoreError::Configuration(format!(
            "dropout_ratio must be in (0, 1), got {ratio}"
        )));
    }
    p.dropout_ratio = Some(ratio);
    Ok(())
}

/// Pass-through unit standing in for a training-time dropout layer.
#[derive(Debug, Clone)]
pub struct DropoutUnit {
    params: DropoutParameters,
    binder: AttributeBinder<DropoutParameters>,
}

impl DropoutUnit {
    /// Create a dropout unit; `length` must be set before use.
    pub fn new() -> Self {
        let binder = AttributeBinder::<DropoutParameters>::new("dropout")
            .bind("length", ParameterKind::Size, |p, v| {
                p.length = Some(positive_size(v, "length")?);
                Ok(())
            })
            .bind("dropout_ratio", ParameterKind::Scalar, set_ratio);
        Self {
            params: DropoutParameters::default(),
            binder,
        }
    }

    /// The training-time drop ratio, if configured.
    pub fn dropout_ratio(&self) -> Option<f32> {
        self.params.dropout_ratio
    }
}

impl Default for DropoutUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeUnit for DropoutUnit {
    fn kind(&self) -> &str {
        "dropout"
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
        self.params.length
    }

    fn output_size(&self) -> Option<usize> {
        self.params.length
    }

    fn missing_parameter(&self) -> Option<&'static str> {
        self.params.length.is_none().then_some("length")
    }

    fn execute(&self, input: &[f32], output: &mut [f32]) -> Result<()> {
        self.check_io(input, output)?;
        output.copy_from_slice(input);
        Ok(())
    }
}
