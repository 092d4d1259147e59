use ndarray_rand::rand::Rng;
use tracing::{debug, info, warn};

use crate::config::TrainingConfig;
use crate::data::{DataReader, Example, Split};
use crate::error::{Error, Result};
use crate::math::argmax;
use crate::network::Network;
use crate::optimizer::UpdateRule;

/// Losses and accuracy of the network over one split.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Evaluation {
    pub mse: f64,
    pub nll: f64,
    pub correct: usize,
    pub total: usize,
}

impl Evaluation {
    pub fn accuracy(&self) -> f64 {
        self.correct as f64 / self.total as f64
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EpochReport {
    pub epoch: u32,
    pub batches: usize,
    pub evaluation: Option<Evaluation>,
}

/// Mini-batch stochastic gradient descent. Owns the network for the whole run, so it is
/// the only thing that ever mutates the parameters while training.
#[derive(Debug)]
pub struct Sgd {
    network: Network,
    learning_rate: f64,
    batch_size: usize,
    epochs: u32,
    rule: UpdateRule,
    evaluate: bool,
}

impl Sgd {
    pub fn new(network: Network, config: &TrainingConfig) -> Result<Sgd> {
        config.validate()?;
        if network.sizes() != config.sizes.as_slice() {
            return Err(Error::InvalidConfiguration(format!(
                "network sizes {:?} do not match configured sizes {:?}",
                network.sizes(),
                config.sizes
            )));
        }
        Ok(Sgd {
            network,
            learning_rate: config.learning_rate,
            batch_size: config.batch_size,
            epochs: config.epochs,
            rule: config.update_rule(),
            evaluate: config.evaluate,
        })
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn into_network(self) -> Network {
        self.network
    }

    pub fn rule(&self) -> UpdateRule {
        self.rule
    }

    /// Run every configured epoch. Each epoch shuffles the training split, walks it batch by
    /// batch (computing gradients and applying the update rule), and then, if enabled,
    /// evaluates the network on the test split.
    pub fn training_program<D, R>(
        &mut self,
        data: &mut D,
        rng: &mut R,
    ) -> Result<Vec<EpochReport>>
    where
        D: DataReader,
        R: Rng + ?Sized,
    {
        info!(
            epochs = self.epochs,
            batch_size = self.batch_size,
            learning_rate = self.learning_rate,
            rule = ?self.rule,
            train = data.split(Split::Train).len(),
            "starting training"
        );

        let mut reports = Vec::with_capacity(self.epochs as usize);
        for epoch in 0..self.epochs {
            let batches = self.train_epoch(data, rng)?;
            let evaluation = if self.evaluate {
                self.evaluate_split(data.split(Split::Test))?
            } else {
                None
            };

            match &evaluation {
                Some(e) => info!(
                    epoch,
                    mse = e.mse,
                    nll = e.nll,
                    "Epoch {epoch}: {} / {}",
                    e.correct,
                    e.total
                ),
                None => info!(epoch, batches, "Epoch {epoch} complete"),
            }
            reports.push(EpochReport {
                epoch,
                batches,
                evaluation,
            });
        }
        Ok(reports)
    }

    /// One pass over the training split. Returns the number of batches processed.
    pub fn train_epoch<D, R>(&mut self, data: &mut D, rng: &mut R) -> Result<usize>
    where
        D: DataReader,
        R: Rng + ?Sized,
    {
        data.shuffle(Split::Train, rng);

        let mut batches = 0;
        loop {
            let batch = data.get_batch(self.batch_size, Split::Train)?;
            if batch.is_empty() {
                break;
            }
            self.train_batch(batch)?;
            batches += 1;
        }
        Ok(batches)
    }

    /// Gradient computation and a single parameter update for one batch.
    pub fn train_batch(&mut self, batch: &[Example]) -> Result<()> {
        let gradients = self.network.back_prop(batch)?;
        self.network
            .update(&gradients, self.learning_rate, batch.len(), self.rule)?;
        debug!(examples = batch.len(), "applied update");
        Ok(())
    }

    /// Losses and accuracy on `examples`, or `None` when there is nothing to evaluate.
    pub fn evaluate_split(&self, examples: &[Example]) -> Result<Option<Evaluation>> {
        if examples.is_empty() {
            warn!("evaluation requested but the split is empty");
            return Ok(None);
        }
        let result = self.network.feed_forward(examples, false)?;
        let losses = result.losses.ok_or(Error::EmptyBatch)?;

        // Accuracy is counted from the same outputs the losses were computed on.
        let correct = result
            .outputs
            .iter()
            .map(|output| argmax(output.view()))
            .zip(examples)
            .filter(|(predicted, example)| *predicted == Some(example.label))
            .count();

        Ok(Some(Evaluation {
            mse: losses.mse,
            nll: losses.nll,
            correct,
            total: examples.len(),
        }))
    }
}
