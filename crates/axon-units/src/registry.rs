//! Unit construction by kind identifier.

use std::collections::HashMap;
use std::fmt;

use axon_core::{CoreError, Result};

use crate::activation::Activation;
use crate::dense::DenseUnit;
use crate::dropout::DropoutUnit;
use crate::elementwise::ActivationUnit;
use crate::softmax::SoftmaxUnit;
use crate::unit::ComputeUnit;

/// Builds a fresh, unconfigured unit.
pub type UnitFactory = Box<dyn Fn() -> Box<dyn ComputeUnit> + Send + Sync>;

/// Registry of every unit kind a workflow can be built from.
pub struct UnitRegistry {
    factories: HashMap<String, UnitFactory>,
}

impl UnitRegistry {
    /// Create a registry with all built-in unit kinds.
    pub fn new() -> Self {
        let mut registry = Self::empty();

        registry.register_dense();
        registry.register_activations();
        registry.register("softmax", || Box::new(SoftmaxUnit::new()));
        registry.register("dropout", || Box::new(DropoutUnit::new()));

        registry
    }

    /// Create a registry with no kinds registered.
    pub fn empty() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a factory, replacing any previous one for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn ComputeUnit> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    /// Instantiate a unit of the given kind.
    pub fn create(&self, kind: &str) -> Result<Box<dyn ComputeUnit>> {
        self.factories
            .get(kind)
            .map(|factory| factory())
            .ok_or_else(|| CoreError::UnknownUnitKind(kind.to_string()))
    }

    /// Check if a kind is registered.
    pub fn is_supported(&self, kind: &str) -> bool {
        self.factories.contains_key(kind)
    }

    /// All registered kinds, sorted.
    pub fn supported_kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    // Keyed by the unit's own `kind()`, so every name a dense or activation
    // unit can report after reconfiguration is constructible here.
    fn register_dense(&mut self) {
        for activation in Activation::ALL {
            let kind = DenseUnit::new(activation).kind().to_string();
            self.register(kind, move || Box::new(DenseUnit::new(activation)));
        }
    }

    fn register_activations(&mut self) {
        for activation in Activation::ALL {
            let kind = ActivationUnit::new(activation).kind().to_string();
            self.register(kind, move || Box::new(ActivationUnit::new(activation)));
        }
    }
}

impl Default for UnitRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for UnitRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitRegistry")
            .field("kinds", &self.supported_kinds())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_kinds() {
        let registry = UnitRegistry::new();
        for kind in [
            "all2all",
            "all2all_tanh",
            "all2all_scaled_tanh",
            "all2all_sigmoid",
            "all2all_relu",
            "all2all_softplus",
            "all2all_log",
            "activation_identity",
            "activation_tanh",
            "activation_scaled_tanh",
            "activation_sigmoid",
            "activation_relu",
            "activation_softplus",
            "activation_log",
            "softmax",
            "dropout",
        ] {
            assert!(registry.is_supported(kind), "{kind}");
            // A fresh unit reports the kind it was created under.
            assert_eq!(registry.create(kind).unwrap().kind(), kind);
        }
        assert_eq!(registry.supported_kinds().len(), 16);
    }

    #[test]
    fn test_reconfigured_kind_stays_registered() {
        let registry = UnitRegistry::new();
        for base in ["all2all", "activation_relu"] {
            for activation in Activation::ALL {
                let mut unit = registry.create(base).unwrap();
                unit.set_parameter("activation", activation.name().into())
                    .unwrap();
                assert!(registry.is_supported(unit.kind()), "{}", unit.kind());
            }
        }
    }

    #[test]
    fn test_unknown_kind() {
        let registry = UnitRegistry::new();
        let err = registry.create("conv").unwrap_err();
        assert!(matches!(err, CoreError::UnknownUnitKind(ref k) if k == "conv"));
    }

    #[test]
    fn test_custom_registration() {
        let mut registry = UnitRegistry::empty();
        assert!(registry.supported_kinds().is_empty());

        registry.register("wide_dense", || Box::new(DenseUnit::new(Activation::Relu)));
        let unit = registry.create("wide_dense").unwrap();
        assert_eq!(unit.kind(), "all2all_relu");
        assert!(!unit.is_configured());
    }

    #[test]
    fn test_created_units_are_independent() {
        let registry = UnitRegistry::new();
        let mut a = registry.create("softmax").unwrap();
        let b = registry.create("softmax").unwrap();
        a.set_parameter("length", 4usize.into()).unwrap();
        assert_eq!(a.input_size(), Some(4));
        assert_eq!(b.input_size(), None);
    }
}
