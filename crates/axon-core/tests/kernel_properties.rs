//! Property-based tests for the CPU math kernel.

use axon_core::{CpuKernel, MatMulShape, MathKernel};
use proptest::prelude::*;

fn naive_row_product(x: &[f32], w: &[f32], cols: usize) -> Vec<f32> {
    (0..cols)
        .map(|j| x.iter().enumerate().map(|(i, v)| v * w[i * cols + j]).sum())
        .collect()
}

fn dims_and_data() -> impl Strategy<Value = (usize, usize, Vec<f32>, Vec<f32>)> {
    (1usize..24, 1usize..24).prop_flat_map(|(inner, cols)| {
        (
            Just(inner),
            Just(cols),
            prop::collection::vec(-10.0_f32..10.0, inner),
            prop::collection::vec(-10.0_f32..10.0, inner * cols),
        )
    })
}

proptest! {
    #[test]
    fn test_row_vector_product_matches_naive((inner, cols, x, w) in dims_and_data()) {
        let kernel = CpuKernel::new();
        let mut out = vec![0.0; cols];
        kernel.matrix_multiply(&x, &w, MatMulShape::row_vector(inner, cols), &mut out).unwrap();

        let expected = naive_row_product(&x, &w, cols);
        for (got, want) in out.iter().zip(&expected) {
            prop_assert!((got - want).abs() <= 1e-3 * (1.0 + want.abs()), "{} vs {}", got, want);
        }
    }

    #[test]
    fn test_matrix_add_is_elementwise(data in prop::collection::vec((-100.0_f32..100.0, -100.0_f32..100.0), 1..64)) {
        let kernel = CpuKernel::new();
        let (a, b): (Vec<f32>, Vec<f32>) = data.into_iter().unzip();
        let mut out = vec![0.0; a.len()];
        kernel.matrix_add(&a, &b, 1, a.len(), &mut out).unwrap();

        for i in 0..a.len() {
            prop_assert_eq!(out[i], a[i] + b[i]);
        }
    }

    #[test]
    fn test_wrong_lengths_are_rejected((inner, cols, x, w) in dims_and_data()) {
        let kernel = CpuKernel::new();
        let mut out = vec![0.0; cols + 1];
        prop_assert!(kernel.matrix_multiply(&x, &w, MatMulShape::row_vector(inner, cols), &mut out).is_err());
    }
}
