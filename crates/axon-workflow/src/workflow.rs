//! Linear pipelines of compute units.
//!
//! A [`Workflow`] owns its units in execution order. Execution threads the
//! caller's input through every unit: unit k writes into an intermediate
//! buffer sized to its output, which becomes the input of unit k+1, and the
//! last unit writes straight into the caller's output.
//!
//! Intermediate buffers are borrowed from the workflow's [`BufferPool`] per
//! call, so a single `&Workflow` can be executed from several threads at once
//! and repeated calls do not allocate once the pool is warm.

use std::sync::Arc;

use axon_core::{BufferPool, CoreError, ParameterPolicy, ParameterValue, PooledBuffer, Result};
use axon_units::{ComputeUnit, UnitRegistry};
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::config::WorkflowConfig;

/// Position of a unit in its workflow.
pub type UnitId = usize;

#[derive(Debug)]
struct Stage {
    name: Option<String>,
    unit: Box<dyn ComputeUnit>,
}

impl Stage {
    fn label(&self, id: UnitId) -> String {
        match &self.name {
            Some(name) => format!("{} '{}'", self.unit.kind(), name),
            None => format!("{} #{}", self.unit.kind(), id),
        }
    }
}

/// An ordered chain of compute units.
///
/// # Example
///
/// ```rust
/// use axon_units::{Activation, DenseUnit};
/// use axon_workflow::Workflow;
///
/// let mut workflow = Workflow::new();
/// let fc = workflow.add_unit(Box::new(DenseUnit::new(Activation::Tanh)));
/// workflow.set_parameter(fc, "weights", vec![1.0, 0.0, 0.0, 1.0].into())?;
/// workflow.set_parameter(fc, "bias", vec![0.5, -0.5].into())?;
///
/// let output = workflow.execute(&[1.0, 1.0])?;
/// assert!((output[0] - 1.5f32.tanh()).abs() < 1e-6);
/// # Ok::<(), axon_core::CoreError>(())
/// ```
#[derive(Debug)]
pub struct Workflow {
    stages: Vec<Stage>,
    pool: Arc<BufferPool>,
    policy: ParameterPolicy,
}

impl Workflow {
    /// Create an empty workflow with default settings.
    pub fn new() -> Self {
        Self::with_config(&WorkflowConfig::default())
    }

    /// Create an empty workflow using the policy and pool settings of
    /// `config`. Its layer list is ignored; see [`Self::from_config`].
    pub fn with_config(config: &WorkflowConfig) -> Self {
        Self {
            stages: Vec::new(),
            pool: Arc::new(BufferPool::with_config(config.pool.clone())),
            policy: config.parameter_policy,
        }
    }

    /// Build the full unit chain described by `config`.
    ///
    /// Each layer is created through `registry` and its settings applied via
    /// `set_parameter`. Buffers still have to be supplied before execution.
    pub fn from_config(config: &WorkflowConfig, registry: &UnitRegistry) -> Result<Self> {
        let mut workflow = Self::with_config(config);
        for layer in &config.layers {
            let id = workflow.add_kind(registry, &layer.kind, layer.name.as_deref())?;
            for (key, setting) in &layer.settings {
                workflow.set_parameter(id, key, setting.clone().into())?;
            }
        }
        info!(
            "Built workflow with {} units ({:?} parameter policy)",
            workflow.len(),
            workflow.policy
        );
        Ok(workflow)
    }

    /// Append a unit; it runs after every unit added before it.
    pub fn add_unit(&mut self, unit: Box<dyn ComputeUnit>) -> UnitId {
        self.push(None, unit)
    }

    /// Append a unit addressable by `name`. Names must be unique.
    pub fn add_named_unit(
        &mut self,
        name: impl Into<String>,
        unit: Box<dyn ComputeUnit>,
    ) -> Result<UnitId> {
        let name = name.into();
        if self.unit_id(&name).is_some() {
            return Err(CoreError::Configuration(format!(
                "a unit named '{name}' already exists"
            )));
        }
        Ok(self.push(Some(name), unit))
    }

    /// Create a unit of `kind` from `registry` and append it.
    pub fn add_kind(
        &mut self,
        registry: &UnitRegistry,
        kind: &str,
        name: Option<&str>,
    ) -> Result<UnitId> {
        let unit = registry.create(kind)?;
        match name {
            Some(name) => self.add_named_unit(name, unit),
            None => Ok(self.add_unit(unit)),
        }
    }

    fn push(&mut self, name: Option<String>, mut unit: Box<dyn ComputeUnit>) -> UnitId {
        unit.set_parameter_policy(self.policy);
        let id = self.stages.len();
        debug!("Appending unit #{} ({}) {:?}", id, unit.kind(), name);
        self.stages.push(Stage { name, unit });
        id
    }

    /// Configure a parameter of the unit at `id`.
    pub fn set_parameter(&mut self, id: UnitId, name: &str, value: ParameterValue) -> Result<()> {
        let stage = self
            .stages
            .get_mut(id)
            .ok_or_else(|| CoreError::UnknownUnit(format!("#{id}")))?;
        stage.unit.set_parameter(name, value)
    }

    /// Configure a parameter of the unit called `unit_name`.
    pub fn set_named_parameter(
        &mut self,
        unit_name: &str,
        name: &str,
        value: ParameterValue,
    ) -> Result<()> {
        let id = self
            .unit_id(unit_name)
            .ok_or_else(|| CoreError::UnknownUnit(unit_name.to_string()))?;
        self.set_parameter(id, name, value)
    }

    /// Change the unknown-parameter policy of the workflow and all its units.
    pub fn set_parameter_policy(&mut self, policy: ParameterPolicy) {
        self.policy = policy;
        for stage in &mut self.stages {
            stage.unit.set_parameter_policy(policy);
        }
    }

    /// Current unknown-parameter policy.
    pub fn parameter_policy(&self) -> ParameterPolicy {
        self.policy
    }

    /// The unit at `id`.
    pub fn unit(&self, id: UnitId) -> Option<&dyn ComputeUnit> {
        self.stages.get(id).map(|s| s.unit.as_ref())
    }

    /// Id of the unit called `name`.
    pub fn unit_id(&self, name: &str) -> Option<UnitId> {
        self.stages
            .iter()
            .position(|s| s.name.as_deref() == Some(name))
    }

    /// Number of units.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Whether the workflow has no units.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Pool backing the intermediate buffers.
    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    /// Input length of the first unit.
    pub fn input_size(&self) -> Option<usize> {
        self.stages.first()?.unit.input_size()
    }

    /// Output length of the last unit.
    pub fn output_size(&self) -> Option<usize> {
        self.stages.last()?.unit.output_size()
    }

    /// Check that every unit is configured and adjacent sizes agree.
    pub fn validate(&self) -> Result<()> {
        if self.stages.is_empty() {
            return Err(CoreError::EmptyWorkflow);
        }

        for (id, stage) in self.stages.iter().enumerate() {
            if let Some(parameter) = stage.unit.missing_parameter() {
                return Err(CoreError::not_configured(stage.label(id), parameter));
            }
        }

        for (id, pair) in self.stages.windows(2).enumerate() {
            let produced = Self::size_of(&pair[0], id, pair[0].unit.output_size())?;
            let expected = Self::size_of(&pair[1], id + 1, pair[1].unit.input_size())?;
            if produced != expected {
                return Err(CoreError::dimension_mismatch(
                    format!("input of {}", pair[1].label(id + 1)),
                    expected,
                    produced,
                ));
            }
        }
        Ok(())
    }

    fn size_of(stage: &Stage, id: UnitId, size: Option<usize>) -> Result<usize> {
        size.ok_or_else(|| CoreError::not_configured(stage.label(id), "size"))
    }

    /// Run the chain, writing the final result into `output`.
    pub fn execute_into(&self, input: &[f32], output: &mut [f32]) -> Result<()> {
        self.validate()?;
        self.run(input, output)
    }

    /// Run the chain and return a freshly allocated output.
    pub fn execute(&self, input: &[f32]) -> Result<Vec<f32>> {
        self.validate()?;
        self.run_alloc(input)
    }

    /// Run independent samples in parallel; results keep the input order.
    ///
    /// The chain is validated once for the whole batch.
    pub fn execute_batch(&self, inputs: &[Vec<f32>]) -> Result<Vec<Vec<f32>>> {
        self.validate()?;
        debug!("Executing batch of {} samples", inputs.len());
        inputs.par_iter().map(|input| self.run_alloc(input)).collect()
    }

    fn run_alloc(&self, input: &[f32]) -> Result<Vec<f32>> {
        let mut output = vec![0.0; self.output_size().unwrap_or_default()];
        self.run(input, &mut output)?;
        Ok(output)
    }

    // Callers have validated the chain, so every size below is known.
    fn run(&self, input: &[f32], output: &mut [f32]) -> Result<()> {
        let (last, init) = self.stages.split_last().ok_or(CoreError::EmptyWorkflow)?;

        let expected_in = self.input_size().unwrap_or_default();
        if input.len() != expected_in {
            return Err(CoreError::dimension_mismatch("workflow input", expected_in, input.len()));
        }
        let expected_out = last.unit.output_size().unwrap_or_default();
        if output.len() != expected_out {
            return Err(CoreError::dimension_mismatch(
                "workflow output",
                expected_out,
                output.len(),
            ));
        }

        let mut current: Option<PooledBuffer<'_>> = None;
        for (id, stage) in init.iter().enumerate() {
            let mut next = self.pool.acquire(stage.unit.output_size().unwrap_or_default());
            trace!("Executing {}", stage.label(id));
            stage
                .unit
                .execute(current.as_deref().unwrap_or(input), &mut next)?;
            // The previous intermediate goes back to the pool here.
            current = Some(next);
        }

        trace!("Executing {}", last.label(init.len()));
        last.unit
            .execute(current.as_deref().unwrap_or(input), output)
    }
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axon_units::{Activation, DenseUnit, SoftmaxUnit};

    /// Copies its input and counts how often its configuration is inspected.
    #[derive(Debug, Default)]
    struct CountingUnit {
        inspections: Arc<AtomicUsize>,
        policy: ParameterPolicy,
    }

    impl ComputeUnit for CountingUnit {
        fn kind(&self) -> &str {
            "counting"
        }

        fn set_parameter(&mut self, _name: &str, _value: ParameterValue) -> Result<()> {
            Ok(())
        }

        fn parameter_policy(&self) -> ParameterPolicy {
            self.policy
        }

        fn set_parameter_policy(&mut self, policy: ParameterPolicy) {
            self.policy = policy;
        }

        fn input_size(&self) -> Option<usize> {
            Some(2)
        }

        fn output_size(&self) -> Option<usize> {
            Some(2)
        }

        fn missing_parameter(&self) -> Option<&'static str> {
            self.inspections.fetch_add(1, Ordering::SeqCst);
            None
        }

        fn execute(&self, input: &[f32], output: &mut [f32]) -> Result<()> {
            output.copy_from_slice(input);
            Ok(())
        }
    }

    fn dense(weights: Vec<f32>, bias: Vec<f32>, activation: Activation) -> Box<dyn ComputeUnit> {
        let mut unit = DenseUnit::new(activation);
        unit.set_parameter("weights", weights.into()).unwrap();
        unit.set_parameter("bias", bias.into()).unwrap();
        Box::new(unit)
    }

    #[test]
    fn test_empty_workflow() {
        let workflow = Workflow::new();
        assert!(workflow.is_empty());
        assert!(matches!(workflow.validate(), Err(CoreError::EmptyWorkflow)));
        assert!(matches!(
            workflow.execute(&[1.0]),
            Err(CoreError::EmptyWorkflow)
        ));
    }

    #[test]
    fn test_single_unit() {
        let mut workflow = Workflow::new();
        workflow.add_unit(dense(vec![2.0, 3.0], vec![1.0], Activation::Identity));
        assert_eq!(workflow.input_size(), Some(2));
        assert_eq!(workflow.output_size(), Some(1));
        assert_eq!(workflow.execute(&[1.0, 1.0]).unwrap(), vec![6.0]);
    }

    #[test]
    fn test_chain_size_mismatch() {
        let mut workflow = Workflow::new();
        workflow.add_unit(dense(vec![1.0; 6], vec![0.0; 3], Activation::Identity));
        workflow.add_unit(dense(vec![1.0; 4], vec![0.0; 2], Activation::Identity));

        let err = workflow.validate().unwrap_err();
        assert!(matches!(
            err,
            CoreError::DimensionMismatch {
                expected: 2,
                actual: 3,
                ..
            }
        ));
    }

    #[test]
    fn test_unconfigured_unit_reported() {
        let mut workflow = Workflow::new();
        workflow.add_unit(dense(vec![1.0; 4], vec![0.0; 2], Activation::Identity));
        workflow
            .add_named_unit("probs", Box::new(SoftmaxUnit::new()))
            .unwrap();

        match workflow.execute(&[1.0, 2.0]).unwrap_err() {
            CoreError::NotConfigured { unit, parameter } => {
                assert_eq!(unit, "softmax 'probs'");
                assert_eq!(parameter, "length");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_io_lengths_checked() {
        let mut workflow = Workflow::new();
        workflow.add_unit(dense(vec![1.0; 4], vec![0.0; 2], Activation::Identity));

        assert!(matches!(
            workflow.execute(&[1.0, 2.0, 3.0]),
            Err(CoreError::DimensionMismatch { .. })
        ));
        let mut output = [0.0; 3];
        assert!(matches!(
            workflow.execute_into(&[1.0, 2.0], &mut output),
            Err(CoreError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_named_units() {
        let mut workflow = Workflow::new();
        workflow
            .add_named_unit("fc", Box::new(DenseUnit::default()))
            .unwrap();
        assert!(workflow
            .add_named_unit("fc", Box::new(DenseUnit::default()))
            .is_err());

        workflow
            .set_named_parameter("fc", "weights", vec![1.0, 1.0].into())
            .unwrap();
        workflow
            .set_named_parameter("fc", "bias", vec![0.0].into())
            .unwrap();
        assert!(matches!(
            workflow.set_named_parameter("nope", "bias", vec![0.0].into()),
            Err(CoreError::UnknownUnit(_))
        ));
        assert!(matches!(
            workflow.set_parameter(5, "bias", vec![0.0].into()),
            Err(CoreError::UnknownUnit(_))
        ));

        assert_eq!(workflow.execute(&[2.0, 3.0]).unwrap(), vec![5.0]);
    }

    #[test]
    fn test_policy_propagates_to_units() {
        let mut workflow = Workflow::new();
        let id = workflow.add_unit(Box::new(DenseUnit::default()));
        workflow.set_parameter(id, "momentum", 0.9f32.into()).unwrap();

        workflow.set_parameter_policy(ParameterPolicy::Strict);
        assert_eq!(
            workflow.unit(id).map(|u| u.parameter_policy()),
            Some(ParameterPolicy::Strict)
        );
        assert!(matches!(
            workflow.set_parameter(id, "momentum", 0.9f32.into()),
            Err(CoreError::UnknownParameter { .. })
        ));

        // Units appended later inherit the policy.
        let later = workflow.add_unit(Box::new(SoftmaxUnit::new()));
        assert_eq!(
            workflow.unit(later).map(|u| u.parameter_policy()),
            Some(ParameterPolicy::Strict)
        );
    }

    #[test]
    fn test_intermediates_reused_across_calls() {
        let mut workflow = Workflow::new();
        workflow.add_unit(dense(vec![1.0; 4], vec![0.0; 2], Activation::Identity));
        workflow.add_unit(dense(vec![1.0; 4], vec![0.0; 2], Activation::Identity));
        workflow.add_unit(dense(vec![1.0; 4], vec![0.0; 2], Activation::Identity));

        workflow.execute(&[1.0, 1.0]).unwrap();
        workflow.execute(&[1.0, 1.0]).unwrap();

        let stats = workflow.pool().stats();
        // Two intermediates per call; the second call is served from the pool.
        assert_eq!(stats.total_acquires, 4);
        assert!(stats.cache_hits >= 2);
        assert_eq!(stats.total_returns, 4);
    }

    #[test]
    fn test_chain_validated_once_per_call() {
        let inspections = Arc::new(AtomicUsize::new(0));
        let mut workflow = Workflow::new();
        workflow.add_unit(Box::new(CountingUnit {
            inspections: Arc::clone(&inspections),
            ..CountingUnit::default()
        }));

        assert_eq!(workflow.execute(&[1.0, 2.0]).unwrap(), vec![1.0, 2.0]);
        assert_eq!(inspections.swap(0, Ordering::SeqCst), 1);

        let mut output = [0.0; 2];
        workflow.execute_into(&[3.0, 4.0], &mut output).unwrap();
        assert_eq!(output, [3.0, 4.0]);
        assert_eq!(inspections.swap(0, Ordering::SeqCst), 1);

        let inputs: Vec<Vec<f32>> = (0..16).map(|i| vec![i as f32, 0.0]).collect();
        let outputs = workflow.execute_batch(&inputs).unwrap();
        assert_eq!(outputs, inputs);
        assert_eq!(inspections.load(Ordering::SeqCst), 1);
    }
}
