use crate::error::{Error, Result};
use crate::network::validate_sizes;
use crate::optimizer::{UpdateRule, validate_learning_rate};

pub const MNIST_INPUT_NEURONS: usize = 28 * 28;
pub const MNIST_OUTPUT_NEURONS: usize = 10;

/// Everything the training orchestrator needs besides the network and the data.
#[derive(Clone, Debug, PartialEq)]
pub struct TrainingConfig {
    pub sizes: Vec<usize>,
    pub learning_rate: f64,
    pub batch_size: usize,
    pub epochs: u32,
    /// Momentum coefficient. `None` selects plain gradient steps.
    pub momentum: Option<f64>,
    /// Evaluate on the test split after every epoch.
    pub evaluate: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        TrainingConfig {
            sizes: vec![MNIST_INPUT_NEURONS, 30, MNIST_OUTPUT_NEURONS],
            learning_rate: 3.0,
            batch_size: 10,
            epochs: 30,
            momentum: None,
            evaluate: true,
        }
    }
}

impl TrainingConfig {
    pub fn update_rule(&self) -> UpdateRule {
        match self.momentum {
            Some(gamma) => UpdateRule::Momentum { gamma },
            None => UpdateRule::Plain,
        }
    }

    /// Layer sizes and learning rate go through the same checks as network construction
    /// and parameter updates.
    pub fn validate(&self) -> Result<()> {
        validate_sizes(&self.sizes)?;
        validate_learning_rate(self.learning_rate)?;
        if self.batch_size == 0 {
            return Err(invalid("batch size must be positive"));
        }
        if self.epochs == 0 {
            return Err(invalid("epoch count must be positive"));
        }
        self.update_rule().validate()
    }
}

fn invalid(message: &str) -> Error {
    Error::InvalidConfiguration(message.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::Network;

    #[test]
    fn default_is_valid_mnist_setup() {
        let config = TrainingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sizes, [784, 30, 10]);
        assert_eq!(config.update_rule(), UpdateRule::Plain);
    }

    #[test]
    fn momentum_selects_momentum_rule() {
        let config = TrainingConfig {
            momentum: Some(0.9),
            ..TrainingConfig::default()
        };
        assert_eq!(config.update_rule(), UpdateRule::Momentum { gamma: 0.9 });
        assert!(config.validate().is_ok());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let base = TrainingConfig::default();
        let invalid = [
            TrainingConfig {
                sizes: vec![784],
                ..base.clone()
            },
            TrainingConfig {
                sizes: vec![784, 0, 10],
                ..base.clone()
            },
            TrainingConfig {
                learning_rate: 0.0,
                ..base.clone()
            },
            TrainingConfig {
                learning_rate: -1.0,
                ..base.clone()
            },
            TrainingConfig {
                learning_rate: f64::NAN,
                ..base.clone()
            },
            TrainingConfig {
                batch_size: 0,
                ..base.clone()
            },
            TrainingConfig {
                epochs: 0,
                ..base.clone()
            },
            TrainingConfig {
                momentum: Some(1.0),
                ..base.clone()
            },
            TrainingConfig {
                momentum: Some(-0.5),
                ..base.clone()
            },
        ];
        for config in invalid {
            assert!(
                matches!(config.validate(), Err(Error::InvalidConfiguration(_))),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn size_errors_match_network_construction() {
        for sizes in [vec![784], vec![784, 0, 10]] {
            let config = TrainingConfig {
                sizes: sizes.clone(),
                ..TrainingConfig::default()
            };
            let from_config = config.validate().unwrap_err().to_string();
            let from_network = Network::new(sizes).unwrap_err().to_string();
            assert_eq!(from_config, from_network);
        }
    }
}
