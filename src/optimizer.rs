//! Parameter update rules applied after a batch's gradients have been summed.

use ndarray::Zip;

use crate::error::{Error, Result};
use crate::network::{Gradients, Network, check_len};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum UpdateRule {
    /// `param -= (eta / batch_len) * nabla`
    #[default]
    Plain,
    /// `velocity = gamma * velocity + (eta / batch_len) * nabla; param -= velocity`
    Momentum { gamma: f64 },
}

impl UpdateRule {
    pub fn validate(&self) -> Result<()> {
        match *self {
            UpdateRule::Plain => Ok(()),
            UpdateRule::Momentum { gamma } => validate_gamma(gamma),
        }
    }
}

impl Network {
    /// Apply one step of `rule` using gradients summed over `batch_len` examples.
    pub fn update(
        &mut self,
        gradients: &Gradients,
        learning_rate: f64,
        batch_len: usize,
        rule: UpdateRule,
    ) -> Result<()> {
        match rule {
            UpdateRule::Plain => self.update_wb(gradients, learning_rate, batch_len),
            UpdateRule::Momentum { gamma } => {
                self.update_wb_momentum(gradients, learning_rate, gamma, batch_len)
            }
        }
    }

    /// Plain gradient step: every weight and bias moves against its gradient by
    /// `learning_rate / batch_len`.
    pub fn update_wb(
        &mut self,
        gradients: &Gradients,
        learning_rate: f64,
        batch_len: usize,
    ) -> Result<()> {
        let step = self.step_size(gradients, learning_rate, batch_len)?;

        // The gradients are sums over the batch, so dividing the learning rate by the batch
        // length turns the step into one along the average gradient. Each parameter then
        // moves by -step times its own gradient, in place.
        for (bias, nabla_bias) in self.biases.iter_mut().zip(&gradients.nabla_biases) {
            bias.scaled_add(-step, nabla_bias);
        }
        for (weight, nabla_weight) in self.weights.iter_mut().zip(&gradients.nabla_weights) {
            weight.scaled_add(-step, nabla_weight);
        }
        Ok(())
    }

    /// Momentum step. The velocities live on the network and carry over between batches
    /// and epochs.
    pub fn update_wb_momentum(
        &mut self,
        gradients: &Gradients,
        learning_rate: f64,
        gamma: f64,
        batch_len: usize,
    ) -> Result<()> {
        validate_gamma(gamma)?;
        let step = self.step_size(gradients, learning_rate, batch_len)?;

        // Decay each velocity by gamma and add this batch's scaled gradient, then subtract
        // the whole velocity from the parameter. From zero velocity the first step is the
        // same step * nabla a plain update takes.
        for ((bias, velocity), nabla_bias) in self
            .biases
            .iter_mut()
            .zip(self.velocity_biases.iter_mut())
            .zip(&gradients.nabla_biases)
        {
            Zip::from(&mut *velocity)
                .and(nabla_bias)
                .for_each(|v, &nb| *v = gamma * *v + step * nb);
            *bias -= &*velocity;
        }
        // Same for the weights, one [next x current] matrix per layer.
        for ((weight, velocity), nabla_weight) in self
            .weights
            .iter_mut()
            .zip(self.velocity_weights.iter_mut())
            .zip(&gradients.nabla_weights)
        {
            Zip::from(&mut *velocity)
                .and(nabla_weight)
                .for_each(|v, &nw| *v = gamma * *v + step * nw);
            *weight -= &*velocity;
        }
        Ok(())
    }

    // Checks everything an update depends on before any parameter is touched, then returns
    // the per-example learning rate.
    fn step_size(
        &self,
        gradients: &Gradients,
        learning_rate: f64,
        batch_len: usize,
    ) -> Result<f64> {
        validate_learning_rate(learning_rate)?;
        if batch_len == 0 {
            return Err(Error::EmptyBatch);
        }

        let layers = self.biases.len();
        check_len("bias gradient layers", layers, gradients.nabla_biases.len())?;
        check_len(
            "weight gradient layers",
            layers,
            gradients.nabla_weights.len(),
        )?;
        for (bias, nabla_bias) in self.biases.iter().zip(&gradients.nabla_biases) {
            check_len("bias gradient length", bias.len(), nabla_bias.len())?;
        }
        for (weight, nabla_weight) in self.weights.iter().zip(&gradients.nabla_weights) {
            check_len("weight gradient rows", weight.nrows(), nabla_weight.nrows())?;
            check_len(
                "weight gradient columns",
                weight.ncols(),
                nabla_weight.ncols(),
            )?;
        }

        Ok(learning_rate / batch_len as f64)
    }
}

/// Finite and strictly positive.
pub(crate) fn validate_learning_rate(learning_rate: f64) -> Result<()> {
    if learning_rate.is_finite() && learning_rate > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "learning rate must be positive, got {learning_rate}"
        )))
    }
}

fn validate_gamma(gamma: f64) -> Result<()> {
    if (0.0..1.0).contains(&gamma) {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "momentum coefficient must be in [0, 1), got {gamma}"
        )))
    }
}
