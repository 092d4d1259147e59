//! Batch-averaged losses between network outputs and one-hot encoded labels.
//!
//! Both take `(output, label)` pairs; each output must be as long as the number of
//! classes it is compared against.

use ndarray::{Array1, Zip};

use crate::error::{Error, Result};
use crate::math::one_hot;

/// Outputs are clamped into `[EPSILON, 1 - EPSILON]` before taking logarithms.
pub const LOG_CLAMP_EPSILON: f64 = 1e-15;

/// Mean squared error: per example, the squared difference against the one-hot target
/// averaged over output dimensions, then averaged over the batch.
pub fn mse(outputs: &[Array1<f64>], labels: &[usize]) -> Result<f64> {
    average_over_batch(outputs, labels, |output, target| {
        Zip::from(output)
            .and(target)
            .fold(0.0, |acc, &o, &t| acc + (o - t).powi(2))
            / output.len() as f64
    })
}

/// Negative log loss (binary cross-entropy per output neuron), averaged over output
/// dimensions and then over the batch.
pub fn nll(outputs: &[Array1<f64>], labels: &[usize]) -> Result<f64> {
    average_over_batch(outputs, labels, |output, target| {
        let total = Zip::from(output)
            .and(target)
            .fold(0.0, |acc, &o, &t| {
                let o = o.clamp(LOG_CLAMP_EPSILON, 1.0 - LOG_CLAMP_EPSILON);
                acc - (t * o.ln() + (1.0 - t) * (1.0 - o).ln())
            });
        total / output.len() as f64
    })
}

fn average_over_batch<F>(outputs: &[Array1<f64>], labels: &[usize], per_example: F) -> Result<f64>
where
    F: Fn(&Array1<f64>, &Array1<f64>) -> f64,
{
    if outputs.len() != labels.len() {
        return Err(Error::ShapeMismatch {
            context: "loss labels",
            expected: outputs.len(),
            found: labels.len(),
        });
    }
    if outputs.is_empty() {
        return Err(Error::EmptyBatch);
    }

    let mut total = 0.0;
    for (output, &label) in outputs.iter().zip(labels) {
        let target = one_hot(label, output.len())?;
        total += per_example(output, &target);
    }
    Ok(total / outputs.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn mse_of_perfect_outputs_is_zero() {
        let outputs = vec![array![1.0, 0.0, 0.0], array![0.0, 0.0, 1.0]];
        assert_eq!(mse(&outputs, &[0, 2]).unwrap(), 0.0);
    }

    #[test]
    fn mse_averages_over_dimensions_then_batch() {
        // (0.25 + 0.25) / 2 = 0.25 and (0.0 + 1.0) / 2 = 0.5
        let outputs = vec![array![0.5, 0.5], array![0.0, 0.0]];
        assert_abs_diff_eq!(mse(&outputs, &[0, 1]).unwrap(), 0.375, epsilon = 1e-12);
    }

    #[test]
    fn nll_matches_hand_computation() {
        let outputs = vec![array![0.8, 0.3]];
        let expected = -((0.8f64).ln() + (0.7f64).ln()) / 2.0;
        assert_abs_diff_eq!(nll(&outputs, &[0]).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn nll_clamps_saturated_outputs() {
        let outputs = vec![array![0.0, 1.0]];
        let loss = nll(&outputs, &[0]).unwrap();
        assert!(loss.is_finite());
        assert!(loss > 30.0);

        let perfect = nll(&[array![1.0, 0.0]], &[0]).unwrap();
        assert!(perfect.is_finite());
        assert!(perfect < 1e-12);
    }

    #[test]
    fn losses_reject_bad_labels_and_lengths() {
        let outputs = vec![array![0.5, 0.5]];
        let result = mse(&outputs, &[2]);
        assert!(matches!(result, Err(Error::InvalidLabel { .. })));
        let result = nll(&outputs, &[0, 1]);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
        assert!(matches!(mse(&[], &[]), Err(Error::EmptyBatch)));
    }
}
