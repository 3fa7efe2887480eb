//! Typed parameter values passed across the configuration boundary.
//!
//! A model loader hands each unit a stream of `(name, ParameterValue)` pairs.
//! Values carry their own [`ParameterKind`] tag so a setter can reject a
//! mismatched value instead of misreading it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Runtime type tag of a [`ParameterValue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterKind {
    /// Contiguous `f32` buffer (weights, bias).
    Floats,
    /// Non-negative length or count.
    Size,
    /// Single `f32` value.
    Scalar,
    /// Free-form string, e.g. an activation name.
    Text,
}

impl fmt::Display for ParameterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ParameterKind::Floats => "floats",
            ParameterKind::Size => "size",
            ParameterKind::Scalar => "scalar",
            ParameterKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// A parameter value with an explicit type tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ParameterValue {
    /// Contiguous `f32` buffer.
    Floats(Vec<f32>),
    /// Length or count.
    Size(usize),
    /// Single float.
    Scalar(f32),
    /// String value.
    Text(String),
}

impl ParameterValue {
    /// The type tag of this value.
    pub fn kind(&self) -> ParameterKind {
        match self {
            ParameterValue::Floats(_) => ParameterKind::Floats,
            ParameterValue::Size(_) => ParameterKind::Size,
            ParameterValue::Scalar(_) => ParameterKind::Scalar,
            ParameterValue::Text(_) => ParameterKind::Text,
        }
    }

    /// Unwrap a float buffer, or report a type mismatch against `parameter`.
    pub fn into_floats(self, parameter: &str) -> Result<Vec<f32>> {
        match self {
            ParameterValue::Floats(v) => Ok(v),
            other => Err(other.mismatch(parameter, ParameterKind::Floats)),
        }
    }

    /// Unwrap a size, or report a type mismatch against `parameter`.
    pub fn into_size(self, parameter: &str) -> Result<usize> {
        match self {
            ParameterValue::Size(v) => Ok(v),
            other => Err(other.mismatch(parameter, ParameterKind::Size)),
        }
    }

    /// Unwrap a scalar, or report a type mismatch against `parameter`.
    pub fn into_scalar(self, parameter: &str) -> Result<f32> {
        match self {
            ParameterValue::Scalar(v) => Ok(v),
            other => Err(other.mismatch(parameter, ParameterKind::Scalar)),
        }
    }

    /// Unwrap a string, or report a type mismatch against `parameter`.
    pub fn into_text(self, parameter: &str) -> Result<String> {
        match self {
            ParameterValue::Text(v) => Ok(v),
            other => Err(other.mismatch(parameter, ParameterKind::Text)),
        }
    }

    fn mismatch(&self, parameter: &str, expected: ParameterKind) -> CoreError {
        CoreError::TypeMismatch {
            parameter: parameter.to_string(),
            expected,
            found: self.kind(),
        }
    }
}

impl From<Vec<f32>> for ParameterValue {
    fn from(v: Vec<f32>) -> Self {
        ParameterValue::Floats(v)
    }
}

impl From<&[f32]> for ParameterValue {
    fn from(v: &[f32]) -> Self {
        ParameterValue::Floats(v.to_vec())
    }
}

impl From<usize> for ParameterValue {
    fn from(v: usize) -> Self {
        ParameterValue::Size(v)
    }
}

impl From<f32> for ParameterValue {
    fn from(v: f32) -> Self {
        ParameterValue::Scalar(v)
    }
}

impl From<&str> for ParameterValue {
    fn from(v: &str) -> Self {
        ParameterValue::Text(v.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(v: String) -> Self {
        ParameterValue::Text(v)
    }
}

/// How a unit treats parameter names it has no binding for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterPolicy {
    /// Ignore unknown names. Lets newer loaders feed extra fields to older units.
    #[default]
    Lenient,
    /// Reject unknown names with [`CoreError::UnknownParameter`].
    Strict,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        assert_eq!(ParameterValue::from(vec![1.0]).kind(), ParameterKind::Floats);
        assert_eq!(ParameterValue::from(3usize).kind(), ParameterKind::Size);
        assert_eq!(ParameterValue::from(0.5f32).kind(), ParameterKind::Scalar);
        assert_eq!(ParameterValue::from("tanh").kind(), ParameterKind::Text);
    }

    #[test]
    fn test_into_floats_mismatch() {
        let err = ParameterValue::Size(4).into_floats("weights").unwrap_err();
        match err {
            CoreError::TypeMismatch {
                parameter,
                expected,
                found,
            } => {
                assert_eq!(parameter, "weights");
                assert_eq!(expected, ParameterKind::Floats);
                assert_eq!(found, ParameterKind::Size);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_serde_tagged_form() {
        let value = ParameterValue::Floats(vec![1.0, 2.0]);
        let json = serde_json::to_string(&value).unwrap();
        assert_eq!(json, r#"{"kind":"floats","value":[1.0,2.0]}"#);

        let policy: ParameterPolicy = serde_json::from_str(r#""strict""#).unwrap();
        assert_eq!(policy, ParameterPolicy::Strict);
    }

    #[test]
    fn test_default_policy_is_lenient() {
        assert_eq!(ParameterPolicy::default(), ParameterPolicy::Lenient);
    }
}
