use ndarray::{Array1, ArrayView1};

use crate::error::{Error, Result};

// Branching on the sign keeps the exponent non-positive, so exp never overflows for
// large-magnitude inputs.
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + f64::exp(-z))
    } else {
        let e = f64::exp(z);
        e / (1.0 + e)
    }
}

pub fn sigmoid_derivative(z: f64) -> f64 {
    let s = sigmoid(z);
    s * (1.0 - s)
}

/// Turn a class label into the activation a perfect network would output: a
/// `[num_classes]` vector that is 1.0 at `label` and 0.0 everywhere else.
pub fn one_hot(label: usize, num_classes: usize) -> Result<Array1<f64>> {
    if label >= num_classes {
        return Err(Error::InvalidLabel { label, num_classes });
    }
    let mut target = Array1::zeros(num_classes);
    target[label] = 1.0;
    Ok(target)
}

/// Index of the largest entry, i.e. the class a network output votes for. `None` for an
/// empty vector.
pub fn argmax(values: ArrayView1<f64>) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(index, _)| index)
}
