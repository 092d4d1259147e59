use ndarray::{Array, Array1, Array2, Axis};
use ndarray_rand::{
    RandomExt,
    rand::{Rng, thread_rng},
    rand_distr::StandardNormal,
};
use tracing::debug;

use crate::data::Example;
use crate::error::{Error, Result};
use crate::loss;
use crate::math::{argmax, one_hot, sigmoid, sigmoid_derivative};

/// Standard deviation of the zero-mean Gaussian that initial weights and biases are drawn from.
pub const INIT_STD_DEV: f64 = 0.5;

/// Summed (not averaged) derivatives of the quadratic cost over a batch, shaped exactly
/// like the network's biases and weights.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradients {
    pub nabla_biases: Vec<Array1<f64>>,
    pub nabla_weights: Vec<Array2<f64>>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Losses {
    pub mse: f64,
    pub nll: f64,
}

/// Result of [`Network::feed_forward`]. `losses` is only filled in when the caller asked
/// for more than the outputs.
#[derive(Clone, Debug)]
pub struct FeedForward {
    pub outputs: Vec<Array1<f64>>,
    pub losses: Option<Losses>,
}

// Pre-activations and activations of every layer for one forward pass. Each column is one
// example. activations[0] is the input itself, so activations[l] is what feeds layer l and
// activations[l + 1] is what layer l produces.
struct ActivationTrace {
    zs: Vec<Array2<f64>>,
    activations: Vec<Array2<f64>>,
}

/// Fully-connected network of sigmoid layers.
///
/// `sizes[0]` is the input dimension and the last entry is the number of output classes.
/// Layer `l` owns `weights[l]` with shape `[sizes[l + 1] x sizes[l]]` and `biases[l]` of
/// length `sizes[l + 1]`. The momentum accumulators have the same shapes, start at zero
/// and only change under [`crate::UpdateRule::Momentum`].
#[derive(Clone, Debug)]
pub struct Network {
    pub(crate) num_layers: usize,
    pub(crate) sizes: Vec<usize>,
    pub(crate) biases: Vec<Array1<f64>>,
    pub(crate) weights: Vec<Array2<f64>>,
    pub(crate) velocity_biases: Vec<Array1<f64>>,
    pub(crate) velocity_weights: Vec<Array2<f64>>,
}

impl Network {
    /// Build a network whose parameters are drawn from the thread-local RNG.
    pub fn new(sizes: Vec<usize>) -> Result<Network> {
        Network::with_rng(sizes, &mut thread_rng())
    }

    /// Build a network whose parameters are drawn from `rng`, so a seeded RNG gives a
    /// reproducible network.
    pub fn with_rng<R: Rng + ?Sized>(sizes: Vec<usize>, rng: &mut R) -> Result<Network> {
        validate_sizes(&sizes)?;

        let biases: Vec<Array1<f64>> = sizes
            // For each size in sizes except the first one, make a [size] vector drawn from
            // N(0, INIT_STD_DEV^2)...
            .iter()
            .skip(1)
            .map(|&size| {
                let bias = Array1::<f64>::random_using(size, StandardNormal, &mut *rng);
                bias * INIT_STD_DEV
            })
            .collect();
        let weights: Vec<Array2<f64>> = sizes
            // And for each size paired with the following size, a [next_size x current_size]
            // matrix from the same distribution.
            .iter()
            .zip(sizes.iter().skip(1))
            .map(|(&current_size, &next_size)| {
                let shape = (next_size, current_size);
                Array2::<f64>::random_using(shape, StandardNormal, &mut *rng) * INIT_STD_DEV
            })
            .collect();

        let network = Network::assemble(sizes, weights, biases);
        debug!(
            sizes = ?network.sizes,
            parameters = network.num_parameters(),
            "initialized network"
        );
        Ok(network)
    }

    /// Build a network from existing parameters, checking every shape against `sizes`.
    /// Momentum accumulators start at zero.
    pub fn from_parameters(
        sizes: Vec<usize>,
        weights: Vec<Array2<f64>>,
        biases: Vec<Array1<f64>>,
    ) -> Result<Network> {
        validate_sizes(&sizes)?;
        let layers = sizes.len() - 1;
        check_len("weight layers", layers, weights.len())?;
        check_len("bias layers", layers, biases.len())?;

        for (layer, (weight, bias)) in weights.iter().zip(&biases).enumerate() {
            check_len("weight rows", sizes[layer + 1], weight.nrows())?;
            check_len("weight columns", sizes[layer], weight.ncols())?;
            check_len("bias length", sizes[layer + 1], bias.len())?;
        }

        Ok(Network::assemble(sizes, weights, biases))
    }

    fn assemble(sizes: Vec<usize>, weights: Vec<Array2<f64>>, biases: Vec<Array1<f64>>) -> Network {
        let velocity_weights = weights
            .iter()
            .map(|weight| Array::zeros(weight.raw_dim()))
            .collect();
        let velocity_biases = biases
            .iter()
            .map(|bias| Array::zeros(bias.raw_dim()))
            .collect();
        Network {
            num_layers: sizes.len(),
            sizes,
            biases,
            weights,
            velocity_biases,
            velocity_weights,
        }
    }

    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    pub fn input_size(&self) -> usize {
        self.sizes[0]
    }

    pub fn output_size(&self) -> usize {
        self.sizes[self.num_layers - 1]
    }

    pub fn num_parameters(&self) -> usize {
        let weights: usize = self.weights.iter().map(|weight| weight.len()).sum();
        let biases: usize = self.biases.iter().map(|bias| bias.len()).sum();
        weights + biases
    }

    pub fn weights(&self) -> &[Array2<f64>] {
        &self.weights
    }

    /// Mutable handle on a single weight, or `None` if any index is out of range. Matrix
    /// shapes cannot be changed through it.
    pub fn weight_mut(&mut self, layer: usize, row: usize, column: usize) -> Option<&mut f64> {
        self.weights.get_mut(layer)?.get_mut((row, column))
    }

    pub fn biases(&self) -> &[Array1<f64>] {
        &self.biases
    }

    pub fn velocity_weights(&self) -> &[Array2<f64>] {
        &self.velocity_weights
    }

    pub fn velocity_biases(&self) -> &[Array1<f64>] {
        &self.velocity_biases
    }

    /// Run every example of `batch` through the network. Unless `outputs_only` is set, the
    /// mean squared error and negative log loss against the true labels are computed too,
    /// and only then do the labels have to be valid. Never touches the parameters.
    pub fn feed_forward(&self, batch: &[Example], outputs_only: bool) -> Result<FeedForward> {
        if outputs_only {
            self.validate_inputs(batch)?;
        } else {
            self.validate_batch(batch)?;
        }

        let outputs: Vec<Array1<f64>> = self
            .forward(self.input_matrix(batch))
            .columns()
            .into_iter()
            .map(|column| column.to_owned())
            .collect();

        let losses = if outputs_only {
            None
        } else {
            let labels: Vec<usize> = batch.iter().map(|example| example.label).collect();
            Some(Losses {
                mse: loss::mse(&outputs, &labels)?,
                nll: loss::nll(&outputs, &labels)?,
            })
        };

        Ok(FeedForward { outputs, losses })
    }

    /// The cost that [`Network::back_prop`] differentiates:
    /// `sum over examples of 0.5 * |output - one_hot(label)|^2`.
    pub fn quadratic_cost(&self, batch: &[Example]) -> Result<f64> {
        self.validate_batch(batch)?;
        let output = self.forward(self.input_matrix(batch));
        let targets = self.target_matrix(batch)?;
        Ok(0.5 * (&output - &targets).mapv(|d| d * d).sum())
    }

    /// Count the examples whose most active output neuron matches the label.
    pub fn evaluate(&self, batch: &[Example]) -> Result<usize> {
        self.validate_batch(batch)?;
        let output = self.forward(self.input_matrix(batch));
        Ok(output
            .columns()
            .into_iter()
            .map(argmax)
            .zip(batch)
            .filter(|(predicted, example)| *predicted == Some(example.label))
            .count())
    }

    /// Compute the gradients of the quadratic cost with respect to every bias and weight,
    /// summed over the batch.
    pub fn back_prop(&self, batch: &[Example]) -> Result<Gradients> {
        self.validate_batch(batch)?;
        let targets = self.target_matrix(batch)?;
        let trace = self.trace(self.input_matrix(batch));

        // Get zero-initialized matrices matching the size of the weights and biases. Every
        // entry is overwritten below, one layer at a time.
        let mut nabla_biases: Vec<Array1<f64>> = self
            .biases
            .iter()
            .map(|bias| Array::zeros(bias.raw_dim()))
            .collect();
        let mut nabla_weights: Vec<Array2<f64>> = self
            .weights
            .iter()
            .map(|weight| Array::zeros(weight.raw_dim()))
            .collect();

        // Parameters are indexed by layer (0..num_layers - 1), while the trace holds one more
        // activation than there are layers because the input comes first. So `last` is the
        // parameter index of the output layer, trace.zs[last] is its pre-activation, and
        // trace.activations[last + 1] is the network output.
        let last = self.num_layers - 2;
        let output = &trace.activations[last + 1];

        // Output error: the derivative of the quadratic cost with respect to the output
        // (a - y), scaled elementwise by how fast the sigmoid was changing at z.
        let mut delta = (output - &targets) * &trace.zs[last].mapv(sigmoid_derivative);

        // Each column of delta is the error of one example. Summing along the columns gives
        // the bias gradient summed over the batch. For the weights, multiplying by the
        // transposed activations that fed this layer adds up the per-example outer products
        // delta . a^T in one product.
        nabla_biases[last] = delta.sum_axis(Axis(1));
        nabla_weights[last] = delta.dot(&trace.activations[last].t());

        // Walk the remaining layers from back to front. The error of layer `layer` comes from
        // pulling the next layer's error back through that layer's weights (W^T . delta),
        // then scaling by sigma'(z) of this layer. trace.activations[layer] is the input that
        // fed this layer, i.e. the previous layer's output, not this layer's own output.
        for layer in (0..last).rev() {
            let pulled_back = self.weights[layer + 1].t().dot(&delta);
            delta = pulled_back * &trace.zs[layer].mapv(sigmoid_derivative);

            nabla_biases[layer] = delta.sum_axis(Axis(1));
            nabla_weights[layer] = delta.dot(&trace.activations[layer].t());
        }

        debug!(examples = batch.len(), "computed batch gradients");
        Ok(Gradients {
            nabla_biases,
            nabla_weights,
        })
    }

    fn forward(&self, input: Array2<f64>) -> Array2<f64> {
        // Overwrite the activation matrix layer by layer, as only the previous one is
        // needed to compute the next.
        let mut activation = input;
        for (bias, weight) in self.biases.iter().zip(self.weights.iter()) {
            activation = weight.dot(&activation) + &bias.view().insert_axis(Axis(1));
            activation.mapv_inplace(sigmoid);
        }
        activation
    }

    fn trace(&self, input: Array2<f64>) -> ActivationTrace {
        let mut activation = input;
        let mut activations = Vec::with_capacity(self.num_layers);
        let mut zs = Vec::with_capacity(self.num_layers - 1);

        // The activation feeding a layer is pushed before it is replaced by that layer's
        // output, so the input lands at activations[0] and the network output is pushed
        // last, after the loop.
        for (bias, weight) in self.biases.iter().zip(self.weights.iter()) {
            let z = weight.dot(&activation) + &bias.view().insert_axis(Axis(1));
            activations.push(activation);
            activation = z.mapv(sigmoid);
            zs.push(z);
        }
        activations.push(activation);

        ActivationTrace { zs, activations }
    }

    // [sizes[0] x batch] matrix with one example per column.
    fn input_matrix(&self, batch: &[Example]) -> Array2<f64> {
        let shape = (self.input_size(), batch.len());
        Array2::from_shape_fn(shape, |(i, j)| batch[j].input[i])
    }

    fn target_matrix(&self, batch: &[Example]) -> Result<Array2<f64>> {
        let mut targets = Array2::<f64>::zeros((self.output_size(), batch.len()));
        for (mut column, example) in targets.columns_mut().into_iter().zip(batch) {
            column.assign(&one_hot(example.label, self.output_size())?);
        }
        Ok(targets)
    }

    /// Reject empty batches, inputs of the wrong length and out-of-range labels before
    /// any arithmetic happens.
    pub fn validate_batch(&self, batch: &[Example]) -> Result<()> {
        self.validate_inputs(batch)?;
        for example in batch {
            if example.label >= self.output_size() {
                return Err(Error::InvalidLabel {
                    label: example.label,
                    num_classes: self.output_size(),
                });
            }
        }
        Ok(())
    }

    fn validate_inputs(&self, batch: &[Example]) -> Result<()> {
        if batch.is_empty() {
            return Err(Error::EmptyBatch);
        }
        for example in batch {
            check_len("example input", self.input_size(), example.input.len())?;
        }
        Ok(())
    }
}

/// At least an input and an output layer, and no empty layers.
pub(crate) fn validate_sizes(sizes: &[usize]) -> Result<()> {
    if sizes.len() < 2 {
        return Err(Error::InvalidConfiguration(format!(
            "a network needs at least 2 layer sizes, got {sizes:?}"
        )));
    }
    if sizes.contains(&0) {
        return Err(Error::InvalidConfiguration(format!(
            "layer sizes must be positive, got {sizes:?}"
        )));
    }
    Ok(())
}

pub(crate) fn check_len(context: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected == found {
        Ok(())
    } else {
        Err(Error::ShapeMismatch {
            context,
            expected,
            found,
        })
    }
}
