use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ndarray_rand::rand::{SeedableRng, rngs::StdRng, thread_rng};
use sigmoid_digits::{DataReader, Network, Sgd, Split, TrainingConfig, mnist, persist};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

/// Train a sigmoid network on MNIST digits
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory holding the four gzipped MNIST IDX files
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Layer sizes, input first and output last
    #[arg(long, value_delimiter = ',', default_value = "784,30,10")]
    sizes: Vec<usize>,

    #[arg(long, default_value = "3.0")]
    learning_rate: f64,

    #[arg(long, default_value = "10")]
    batch_size: usize,

    #[arg(long, default_value = "30")]
    epochs: u32,

    /// Momentum coefficient in [0, 1); plain SGD when omitted
    #[arg(long)]
    momentum: Option<f64>,

    /// Seed for initialization and shuffling
    #[arg(long)]
    seed: Option<u64>,

    /// Skip evaluating on the test split after each epoch
    #[arg(long)]
    no_eval: bool,

    /// Start from a saved network instead of a random one
    #[arg(long)]
    load: Option<PathBuf>,

    /// Write the trained network here
    #[arg(long)]
    save: Option<PathBuf>,

    /// Log every batch
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("installing log subscriber")?;

    let mut config = TrainingConfig {
        sizes: args.sizes,
        learning_rate: args.learning_rate,
        batch_size: args.batch_size,
        epochs: args.epochs,
        momentum: args.momentum,
        evaluate: !args.no_eval,
    };

    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(thread_rng()).context("seeding RNG")?,
    };

    let network = match &args.load {
        Some(path) => persist::load(path)
            .with_context(|| format!("loading network from {}", path.display()))?,
        None => Network::with_rng(config.sizes.clone(), &mut rng)?,
    };
    // A loaded network decides its own shape.
    config.sizes = network.sizes().to_vec();
    config.validate()?;
    let mut data = mnist::load(&args.data_dir)
        .with_context(|| format!("loading MNIST from {}", args.data_dir.display()))?;

    let mut sgd = Sgd::new(network, &config)?;
    sgd.training_program(&mut data, &mut rng)?;

    if let Some(evaluation) = sgd.evaluate_split(data.split(Split::Test))? {
        info!(
            "Final test: {} / {} ({:.2}%)",
            evaluation.correct,
            evaluation.total,
            evaluation.accuracy() * 100.0
        );
    }

    let network = sgd.into_network();
    if let Some(path) = &args.save {
        persist::save(&network, path)
            .with_context(|| format!("saving network to {}", path.display()))?;
    }
    Ok(())
}
