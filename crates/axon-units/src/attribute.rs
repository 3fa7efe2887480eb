//! Name-keyed, type-checked parameter dispatch.
//!
//! Every unit owns one [`AttributeBinder`] built at construction time. Each
//! binding pairs a parameter name with the [`ParameterKind`] it accepts and a
//! setter over the unit's parameter struct, so a loader can configure any unit
//! through a single `set_parameter(name, value)` entry point.

use std::collections::HashMap;
use std::fmt;

use axon_core::{CoreError, ParameterKind, ParameterPolicy, ParameterValue, Result};
use tracing::debug;

/// Setter invoked with a value whose tag has already been checked.
pub type Setter<P> = fn(&mut P, ParameterValue) -> Result<()>;

struct Binding<P> {
    kind: ParameterKind,
    setter: Setter<P>,
}

impl<P> Clone for Binding<P> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            setter: self.setter,
        }
    }
}

/// Maps parameter names to typed setters over a parameter struct `P`.
///
/// ```
/// use axon_core::{ParameterKind, ParameterValue};
/// use axon_units::attribute::AttributeBinder;
///
/// #[derive(Default)]
/// struct Params {
///     gain: f32,
/// }
///
/// let binder = AttributeBinder::<Params>::new("gain_unit").bind(
///     "gain",
///     ParameterKind::Scalar,
///     |p, v| {
///         p.gain = v.into_scalar("gain")?;
///         Ok(())
///     },
/// );
///
/// let mut params = Params::default();
/// binder.dispatch(&mut params, "gain", ParameterValue::Scalar(2.0))?;
/// assert_eq!(params.gain, 2.0);
/// # Ok::<(), axon_core::CoreError>(())
/// ```
pub struct AttributeBinder<P> {
    owner: &'static str,
    bindings: HashMap<&'static str, Binding<P>>,
    policy: ParameterPolicy,
}

impl<P> AttributeBinder<P> {
    /// Create an empty binder. `owner` names the unit in error messages.
    pub fn new(owner: &'static str) -> Self {
        Self {
            owner,
            bindings: HashMap::new(),
            policy: ParameterPolicy::default(),
        }
    }

    /// Builder-style binding for a unit's fixed schema.
    ///
    /// Rebinding a name replaces the earlier setter; use [`Self::try_bind`]
    /// when names come from outside the unit.
    pub fn bind(mut self, name: &'static str, kind: ParameterKind, setter: Setter<P>) -> Self {
        debug_assert!(
            !self.bindings.contains_key(name),
            "parameter '{name}' bound twice"
        );
        self.bindings.insert(name, Binding { kind, setter });
        self
    }

    /// Add a binding, rejecting duplicates.
    pub fn try_bind(
        &mut self,
        name: &'static str,
        kind: ParameterKind,
        setter: Setter<P>,
    ) -> Result<()> {
        if self.bindings.contains_key(name) {
            return Err(CoreError::Configuration(format!(
                "parameter '{}' is already bound on '{}'",
                name, self.owner
            )));
        }
        self.bindings.insert(name, Binding { kind, setter });
        Ok(())
    }

    /// Current unknown-name policy.
    pub fn policy(&self) -> ParameterPolicy {
        self.policy
    }

    /// Change the unknown-name policy.
    pub fn set_policy(&mut self, policy: ParameterPolicy) {
        self.policy = policy;
    }

    /// Builder-style form of [`Self::set_policy`].
    pub fn with_policy(mut self, policy: ParameterPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Kind expected for `name`, if bound.
    pub fn kind_of(&self, name: &str) -> Option<ParameterKind> {
        self.bindings.get(name).map(|b| b.kind)
    }

    /// Bound parameter names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.bindings.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Route `value` to the setter bound to `name`.
    ///
    /// The value's tag is checked before the setter runs, so a mismatch never
    /// touches `target`. Unknown names are ignored or rejected according to
    /// the binder's [`ParameterPolicy`].
    pub fn dispatch(&self, target: &mut P, name: &str, value: ParameterValue) -> Result<()> {
        let Some(binding) = self.bindings.get(name) else {
            return match self.policy {
                ParameterPolicy::Lenient => {
                    debug!("Ignoring unknown parameter '{}' on '{}'", name, self.owner);
                    Ok(())
                }
                ParameterPolicy::Strict => Err(CoreError::UnknownParameter {
                    unit: self.owner.to_string(),
                    parameter: name.to_string(),
                }),
            };
        };

        let found = value.kind();
        if found != binding.kind {
            return Err(CoreError::TypeMismatch {
                parameter: name.to_string(),
                expected: binding.kind,
                found,
            });
        }

        debug!("Setting parameter '{}' ({}) on '{}'", name, found, self.owner);
        (binding.setter)(target, value)
    }
}

impl<P> Clone for AttributeBinder<P> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner,
            bindings: self.bindings.clone(),
            policy: self.policy,
        }
    }
}

impl<P> fmt::Debug for AttributeBinder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttributeBinder")
            .field("owner", &self.owner)
            .field("names", &self.names())
            .field("policy", &self.policy)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct Params {
        values: Vec<f32>,
        count: usize,
    }

    fn binder() -> AttributeBinder<Params> {
        AttributeBinder::<Params>::new("test_unit")
            .bind("values", ParameterKind::Floats, |p, v| {
                p.values = v.into_floats("values")?;
                Ok(())
            })
            .bind("count", ParameterKind::Size, |p, v| {
                let count = v.into_size("count")?;
                if count == 0 {
                    return Err(CoreError::Configuration("count must be positive".into()));
                }
                p.count = count;
                Ok(())
            })
    }

    #[test]
    fn test_dispatch_known_name() {
        let binder = binder();
        let mut params = Params::default();

        binder
            .dispatch(&mut params, "values", ParameterValue::Floats(vec![1.0, 2.0]))
            .unwrap();
        binder.dispatch(&mut params, "count", ParameterValue::Size(3)).unwrap();

        assert_eq!(params.values, vec![1.0, 2.0]);
        assert_eq!(params.count, 3);
    }

    #[test]
    fn test_type_mismatch_leaves_target_untouched() {
        let binder = binder();
        let mut params = Params {
            values: vec![7.0],
            count: 1,
        };

        let err = binder
            .dispatch(&mut params, "values", ParameterValue::Scalar(1.0))
            .unwrap_err();

        assert!(matches!(
            err,
            CoreError::TypeMismatch {
                expected: ParameterKind::Floats,
                found: ParameterKind::Scalar,
                ..
            }
        ));
        assert_eq!(params.values, vec![7.0]);
    }

    #[test]
    fn test_lenient_ignores_unknown() {
        let binder = binder();
        let mut params = Params {
            values: vec![1.0],
            count: 2,
        };

        binder
            .dispatch(&mut params, "momentum", ParameterValue::Scalar(0.9))
            .unwrap();

        assert_eq!(params.values, vec![1.0]);
        assert_eq!(params.count, 2);
    }

    #[test]
    fn test_strict_rejects_unknown() {
        let binder = binder().with_policy(ParameterPolicy::Strict);
        let mut params = Params::default();

        let err = binder
            .dispatch(&mut params, "momentum", ParameterValue::Scalar(0.9))
            .unwrap_err();

        match err {
            CoreError::UnknownParameter { unit, parameter } => {
                assert_eq!(unit, "test_unit");
                assert_eq!(parameter, "momentum");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_setter_validation_propagates() {
        let binder = binder();
        let mut params = Params::default();
        assert!(binder
            .dispatch(&mut params, "count", ParameterValue::Size(0))
            .is_err());
        assert_eq!(params.count, 0);
    }

    #[test]
    fn test_try_bind_duplicate() {
        let mut binder = binder();
        let result = binder.try_bind("count", ParameterKind::Size, |_, _| Ok(()));
        assert!(matches!(result, Err(CoreError::Configuration(_))));
    }

    #[test]
    fn test_schema_introspection() {
        let binder = binder();
        assert_eq!(binder.names(), vec!["count", "values"]);
        assert_eq!(binder.kind_of("count"), Some(ParameterKind::Size));
        assert_eq!(binder.kind_of("missing"), None);
    }
}
