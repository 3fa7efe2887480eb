//! Serializable workflow topology.
//!
//! A config lists the unit kinds of a workflow in execution order together
//! with their shape-like settings. Trained buffers (weights, bias) are never
//! part of a config; a model loader supplies them through
//! [`Workflow::set_parameter`](crate::Workflow::set_parameter).
//!
//! ```json
//! {
//!   "parameter_policy": "strict",
//!   "layers": [
//!     { "type": "all2all_tanh", "name": "hidden", "bias_length": 100 },
//!     { "type": "dropout", "length": 100, "dropout_ratio": 0.5 },
//!     { "type": "all2all", "name": "logits", "bias_length": 10 },
//!     { "type": "softmax", "length": 10 }
//!   ]
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use axon_core::{ParameterPolicy, ParameterValue, PoolConfig, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Top-level workflow configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    /// Policy pushed into every unit for unknown parameter names.
    pub parameter_policy: ParameterPolicy,
    /// Pool for intermediate buffers.
    pub pool: PoolConfig,
    /// Units in execution order.
    pub layers: Vec<LayerSpec>,
}

impl WorkflowConfig {
    /// Parse a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        debug!("Loading workflow config from {:?}", path.as_ref());
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Append a layer, builder style.
    pub fn with_layer(mut self, layer: LayerSpec) -> Self {
        self.layers.push(layer);
        self
    }
}

/// One unit in a [`WorkflowConfig`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerSpec {
    /// Registry kind, e.g. `all2all_tanh`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Optional unique name for addressing the unit later.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Every other key is applied through `set_parameter`.
    #[serde(flatten)]
    pub settings: BTreeMap<String, Setting>,
}

impl LayerSpec {
    /// A layer of the given kind with no settings.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: None,
            settings: BTreeMap::new(),
        }
    }

    /// Set the layer name.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Add a setting.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Setting>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }
}

/// A scalar configuration value.
///
/// JSON integers become sizes, other numbers become scalars and strings stay
/// text, matching the kinds units bind their settings with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Setting {
    /// Non-negative integer.
    Size(usize),
    /// Floating-point number.
    Scalar(f32),
    /// String.
    Text(String),
}

impl From<Setting> for ParameterValue {
    fn from(setting: Setting) -> Self {
        match setting {
            Setting::Size(v) => ParameterValue::Size(v),
            Setting::Scalar(v) => ParameterValue::Scalar(v),
            Setting::Text(v) => ParameterValue::Text(v),
        }
    }
}

impl From<usize> for Setting {
    fn from(v: usize) -> Self {
        Setting::Size(v)
    }
}

impl From<f32> for Setting {
    fn from(v: f32) -> Self {
        Setting::Scalar(v)
    }
}

impl From<&str> for Setting {
    fn from(v: &str) -> Self {
        Setting::Text(v.to_string())
    }
}
