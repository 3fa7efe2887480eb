//! Property-based tests for workflow execution.

use axon_units::{Activation, ComputeUnit, DenseUnit};
use axon_workflow::Workflow;
use proptest::prelude::*;

fn dense_layer(inputs: usize, outputs: usize) -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
    (
        prop::collection::vec(-1.0_f32..1.0, inputs * outputs),
        prop::collection::vec(-1.0_f32..1.0, outputs),
    )
}

/// Sizes of a three-layer chain plus its buffers and one input.
fn chain_strategy() -> impl Strategy<Value = (Vec<(Vec<f32>, Vec<f32>)>, Vec<f32>)> {
    (1usize..12, 1usize..12, 1usize..12, 1usize..12).prop_flat_map(|(a, b, c, d)| {
        (
            (dense_layer(a, b), dense_layer(b, c), dense_layer(c, d))
                .prop_map(|(l1, l2, l3)| vec![l1, l2, l3]),
            prop::collection::vec(-3.0_f32..3.0, a),
        )
    })
}

fn build(layers: &[(Vec<f32>, Vec<f32>)]) -> (Workflow, Vec<DenseUnit>) {
    let activations = [Activation::Tanh, Activation::Relu, Activation::Sigmoid];
    let mut workflow = Workflow::new();
    let mut units = Vec::new();
    for ((weights, bias), activation) in layers.iter().zip(activations) {
        let mut unit = DenseUnit::new(activation);
        unit.set_parameter("weights", weights.clone().into()).unwrap();
        unit.set_parameter("bias", bias.clone().into()).unwrap();
        units.push(unit.clone());
        workflow.add_unit(Box::new(unit));
    }
    (workflow, units)
}

proptest! {
    #[test]
    fn test_workflow_equals_unit_composition((layers, input) in chain_strategy()) {
        let (workflow, units) = build(&layers);

        let mut current = input.clone();
        for unit in &units {
            let mut next = vec![0.0; unit.output_size().unwrap()];
            unit.execute(&current, &mut next).unwrap();
            current = next;
        }

        prop_assert_eq!(workflow.execute(&input).unwrap(), current);
    }

    #[test]
    fn test_repeated_execution_is_stable((layers, input) in chain_strategy()) {
        let (workflow, _) = build(&layers);
        let first = workflow.execute(&input).unwrap();
        for _ in 0..3 {
            prop_assert_eq!(&workflow.execute(&input).unwrap(), &first);
        }
    }

    #[test]
    fn test_batch_equals_sequential((layers, input) in chain_strategy(), samples in 1usize..8) {
        let (workflow, _) = build(&layers);
        let inputs: Vec<Vec<f32>> = (0..samples)
            .map(|s| input.iter().map(|x| x + s as f32 * 0.1).collect())
            .collect();

        let batch = workflow.execute_batch(&inputs).unwrap();
        for (sample, output) in inputs.iter().zip(&batch) {
            prop_assert_eq!(&workflow.execute(sample).unwrap(), output);
        }
    }
}
