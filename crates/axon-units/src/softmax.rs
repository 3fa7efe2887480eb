//! Softmax normalisation unit.

use axon_core::{ParameterKind, ParameterPolicy, ParameterValue, Result};

use crate::attribute::AttributeBinder;
use crate::unit::{positive_size, ComputeUnit};

#[derive(Debug, Clone, Default, PartialEq)]
struct SoftmaxParameters {
    length: Option<usize>,
}

/// Turns a score vector into a probability distribution.
///
/// `output[i] = exp(x[i] - max(x)) / Σ_j exp(x[j] - max(x))`. Subtracting the
/// maximum keeps every exponent ≤ 0.
#[derive(Debug, Clone)]
pub struct SoftmaxUnit {
    params: SoftmaxParameters,
    binder: AttributeBinder<SoftmaxParameters>,
}

impl SoftmaxUnit {
    /// Create a softmax unit; `length` must be set before use.
    pub fn new() -> Self {
        let binder = AttributeBinder::<SoftmaxParameters>::new("softmax").bind(
            "length",
            ParameterKind::Size,
            |p, v| {
                p.length = Some(positive_size(v, "length")?);
                Ok(())
            },
        );
        Self {
            params: SoftmaxParameters::default(),
            binder,
        }
    }
}

impl Default for SoftmaxUnit {
    fn default() -> Self {
        Self::new()
    }
}

impl ComputeUnit for SoftmaxUnit {
    fn kind(&self) -> &str {
        "softmax"
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

        let max = input.iter().copied().fold(f32::NEG_INFINITY, f32::max);
        let mut sum = 0.0;
        for (o, x) in output.iter_mut().zip(input) {
            *o = (x - max).exp();
            sum += *o;
        }
        for o in output.iter_mut() {
            *o /= sum;
        }
        Ok(())
    }
}
