//! The compute-unit contract.

use std::fmt;

use axon_core::{CoreError, ParameterPolicy, ParameterValue, Result};

/// One stage of a forward pass.
///
/// A unit is configured through [`set_parameter`](Self::set_parameter) and then
/// executed any number of times. `execute` takes `&self`: it reads the
/// configured parameters and writes only to the caller's `output` (plus any
/// private scratch), so concurrent calls with distinct output buffers are safe.
pub trait ComputeUnit: Send + Sync + fmt::Debug {
    /// Registry identifier of this unit's kind, e.g. `all2all_tanh`.
    fn kind(&self) -> &str;

    /// Configure one named parameter.
    fn set_parameter(&mut self, name: &str, value: ParameterValue) -> Result<()>;

    /// How unknown parameter names are treated.
    fn parameter_policy(&self) -> ParameterPolicy;

    /// Change how unknown parameter names are treated.
    fn set_parameter_policy(&mut self, policy: ParameterPolicy);

    /// Length of the input buffer, once known.
    fn input_size(&self) -> Option<usize>;

    /// Length of the output buffer, once known.
    fn output_size(&self) -> Option<usize>;

    /// First parameter that must still be set before execution, if any.
    fn missing_parameter(&self) -> Option<&'static str>;

    /// Whether the unit can execute.
    fn is_configured(&self) -> bool {
        self.missing_parameter().is_none()
    }

    /// Run the unit: read `input`, overwrite all of `output`.
    fn execute(&self, input: &[f32], output: &mut [f32]) -> Result<()>;

    /// Check configuration and buffer lengths before touching any data.
    fn check_io(&self, input: &[f32], output: &[f32]) -> Result<()> {
        if let Some(parameter) = self.missing_parameter() {
            return Err(CoreError::not_configured(self.kind(), parameter));
        }
        let (Some(expected_in), Some(expected_out)) = (self.input_size(), self.output_size())
        else {
            return Err(CoreError::not_configured(self.kind(), "size"));
        };
        if input.len() != expected_in {
            return Err(CoreError::dimension_mismatch(
                format!("{} input", self.kind()),
                expected_in,
                input.len(),
            ));
        }
        if output.len() != expected_out {
            return Err(CoreError::dimension_mismatch(
                format!("{} output", self.kind()),
                expected_out,
                output.len(),
            ));
        }
        Ok(())
    }
}

/// Extract a strictly positive length from `value`.
pub(crate) fn positive_size(value: ParameterValue, name: &str) -> Result<usize> {
    let size = value.into_size(name)?;
    if size == 0 {
        return Err(CoreError::Configuration(format!("{name} must be positive")));
    }
    Ok(size)
}
