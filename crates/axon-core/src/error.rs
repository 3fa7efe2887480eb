//! Error types for the Axon runtime.

use thiserror::Error;

use crate::parameter::ParameterKind;

/// Result type used throughout Axon.
pub type Result<T> = std::result::Result<T, CoreError>;

/// Errors raised while configuring or executing units and workflows.
///
/// All variants describe configuration or programming errors. None of them are
/// transient, so callers should treat them as fatal to the current request.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A parameter value was rejected, or a unit is otherwise misconfigured.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A required parameter has not been set yet.
    #[error("Unit '{unit}' is not configured: missing parameter '{parameter}'")]
    NotConfigured {
        /// Kind of the unit that was executed.
        unit: String,
        /// The first missing parameter.
        parameter: String,
    },

    /// A buffer length does not match the configured size.
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// What was being checked.
        context: String,
        /// Configured length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },

    /// The parameter name is not bound on this unit (strict policy only).
    #[error("Unknown parameter '{parameter}' for unit '{unit}'")]
    UnknownParameter {
        /// Kind of the unit being configured.
        unit: String,
        /// The unrecognized name.
        parameter: String,
    },

    /// The value's tag does not match the type the setter expects.
    #[error("Type mismatch for parameter '{parameter}': expected {expected}, found {found}")]
    TypeMismatch {
        /// Parameter name.
        parameter: String,
        /// Kind the setter was bound with.
        expected: ParameterKind,
        /// Kind of the supplied value.
        found: ParameterKind,
    },

    /// No unit factory is registered under this kind.
    #[error("Unknown unit kind: {0}")]
    UnknownUnitKind(String),

    /// No unit in the workflow carries this name.
    #[error("Unknown unit: {0}")]
    UnknownUnit(String),

    /// The workflow has no units to execute.
    #[error("Workflow contains no units")]
    EmptyWorkflow,

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// Shorthand for a [`CoreError::DimensionMismatch`].
    pub fn dimension_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Shorthand for a [`CoreError::NotConfigured`].
    pub fn not_configured(unit: impl Into<String>, parameter: impl Into<String>) -> Self {
        Self::NotConfigured {
            unit: unit.into(),
            parameter: parameter.into(),
        }
    }
}
