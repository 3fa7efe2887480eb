//! Standalone activation unit.

use axon_core::{ParameterKind, ParameterPolicy, ParameterValue, Result};

use crate::activation::Activation;
use crate::attribute::AttributeBinder;
use crate::unit::{positive_size, ComputeUnit};

#[derive(Debug, Clone, Default, PartialEq)]
struct ActivationParameters {
    length: Option<usize>,
    activation: Activation,
}

/// Applies an activation to each element: `output[i] = f(input[i])`.
///
/// Parameters: `length` (size) and `activation` (text).
#[derive(Debug, Clone)]
pub struct ActivationUnit {
    params: ActivationParameters,
    binder: AttributeBinder<ActivationParameters>,
}

impl ActivationUnit {
    /// Create an activation unit; `length` must be set before use.
    pub fn new(activation: Activation) -> Self {
        let binder = AttributeBinder::<ActivationParameters>::new("activation")
            .bind("length", ParameterKind::Size, |p, v| {
                p.length = Some(positive_size(v, "length")?);
                Ok(())
            })
            .bind("activation", ParameterKind::Text, |p, v| {
                p.activation = v.into_text("activation")?.parse()?;
                Ok(())
            });
        Self {
            params: ActivationParameters {
                length: None,
                activation,
            },
            binder,
        }
    }

    /// The configured activation.
    pub fn activation(&self) -> Activation {
        self.params.activation
    }
}

impl ComputeUnit for ActivationUnit {
    fn kind(&self) -> &str {
        match self.params.activation {
            Activation::Identity => "activation_identity",
            Activation::Tanh => "activation_tanh",
            Activation::ScaledTanh => "activation_scaled_tanh",
            Activation::Sigmoid => "activation_sigmoid",
            Activation::Relu => "activation_relu",
            Activation::Softplus => "activation_softplus",
            Activation::Log => "activation_log",
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
        self.params.activation.apply_slice(output);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axon_core::CoreError;

    #[test]
    fn test_log_activation() {
        let mut unit = ActivationUnit::new(Activation::Log);
        unit.set_parameter("length", 3usize.into()).unwrap();
        assert_eq!(unit.kind(), "activation_log");

        let mut output = [0.0; 3];
        unit.execute(&[0.0, 1.0, -1.0], &mut output).unwrap();
        assert_eq!(output[0], 0.0);
        assert!((output[1] - 1.0f32.asinh()).abs() < 1e-6);
        assert!((output[2] + 1.0f32.asinh()).abs() < 1e-6);
    }

    #[test]
    fn test_requires_length() {
        let unit = ActivationUnit::new(Activation::Relu);
        let mut output = [0.0; 2];
        assert!(matches!(
            unit.execute(&[1.0, -1.0], &mut output),
            Err(CoreError::NotConfigured { .. })
        ));
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut unit = ActivationUnit::new(Activation::Relu);
        assert!(matches!(
            unit.set_parameter("length", 0usize.into()),
            Err(CoreError::Configuration(_))
        ));
    }

    #[test]
    fn test_switch_activation() {
        let mut unit = ActivationUnit::new(Activation::Identity);
        unit.set_parameter("length", 2usize.into()).unwrap();
        unit.set_parameter("activation", "relu".into()).unwrap();

        let mut output = [9.0; 2];
        unit.execute(&[-1.0, 2.0], &mut output).unwrap();
        assert_eq!(output, [0.0, 2.0]);
    }
}
