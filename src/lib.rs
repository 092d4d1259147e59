//! Feedforward sigmoid network for digit classification, trained by mini-batch stochastic
//! gradient descent with optional momentum.

pub mod config;
pub mod data;
pub mod error;
pub mod loss;
pub mod math;
pub mod mnist;
pub mod network;
pub mod optimizer;
pub mod persist;
pub mod trainer;

pub use config::TrainingConfig;
pub use data::{DataReader, Dataset, Example, Split};
pub use error::{Error, Result};
pub use network::{FeedForward, Gradients, Losses, Network};
pub use optimizer::UpdateRule;
pub use trainer::{EpochReport, Evaluation, Sgd};
