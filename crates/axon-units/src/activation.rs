//! Elementwise activation functions.

use std::fmt;
use std::str::FromStr;

use axon_core::simd::relu_f32_inplace;
use axon_core::CoreError;
use serde::{Deserialize, Serialize};

/// LeCun's scaled tanh constants: `A · tanh(B · x)`.
const SCALED_TANH_A: f32 = 1.7159;
const SCALED_TANH_B: f32 = 0.6666;

/// A pure scalar map applied after the affine transform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// `x`
    #[default]
    #[serde(alias = "linear")]
    Identity,
    /// `tanh(x)`
    Tanh,
    /// `1.7159 · tanh(0.6666 · x)`
    ScaledTanh,
    /// `1 / (1 + e^-x)`
    Sigmoid,
    /// `max(0, x)`
    Relu,
    /// `ln(1 + e^x)`
    Softplus,
    /// `ln(x + sqrt(x² + 1))`, i.e. `asinh(x)`
    Log,
}

impl Activation {
    /// All supported activations.
    pub const ALL: [Activation; 7] = [
        Activation::Identity,
        Activation::Tanh,
        Activation::ScaledTanh,
        Activation::Sigmoid,
        Activation::Relu,
        Activation::Softplus,
        Activation::Log,
    ];

    /// Canonical name, as accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Activation::Identity => "identity",
            Activation::Tanh => "tanh",
            Activation::ScaledTanh => "scaled_tanh",
            Activation::Sigmoid => "sigmoid",
            Activation::Relu => "relu",
            Activation::Softplus => "softplus",
            Activation::Log => "log",
        }
    }

    /// Apply to one value.
    #[inline]
    pub fn apply(self, x: f32) -> f32 {
        match self {
            Activation::Identity => x,
            Activation::Tanh => x.tanh(),
            Activation::ScaledTanh => SCALED_TANH_A * (SCALED_TANH_B * x).tanh(),
            Activation::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::Relu => x.max(0.0),
            // max(x, 0) + ln(1 + e^-|x|) does not overflow for large |x|.
            Activation::Softplus => x.max(0.0) + (-x.abs()).exp().ln_1p(),
            Activation::Log => x.asinh(),
        }
    }

    /// Apply in place to every element.
    pub fn apply_slice(self, data: &mut [f32]) {
        match self {
            Activation::Identity => {}
            Activation::Relu => relu_f32_inplace(data),
            other => data.iter_mut().for_each(|v| *v = other.apply(*v)),
        }
    }
}

impl fmt::Display for Activation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Activation {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "identity" | "linear" => Ok(Activation::Identity),
            "tanh" => Ok(Activation::Tanh),
            "scaled_tanh" => Ok(Activation::ScaledTanh),
            "sigmoid" => Ok(Activation::Sigmoid),
            "relu" => Ok(Activation::Relu),
            "softplus" => Ok(Activation::Softplus),
            "log" => Ok(Activation::Log),
            other => Err(CoreError::Configuration(format!(
                "unknown activation function '{other}'"
            ))),
        }
    }
}
