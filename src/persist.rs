//! Saving and loading trained parameters as JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::Result;
use crate::network::Network;

/// Layer sizes plus every weight matrix and bias vector. Momentum state is not saved.
#[derive(Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub sizes: Vec<usize>,
    pub weights: Vec<Array2<f64>>,
    pub biases: Vec<Array1<f64>>,
}

impl From<&Network> for Snapshot {
    fn from(network: &Network) -> Self {
        Snapshot {
            sizes: network.sizes().to_vec(),
            weights: network.weights().to_vec(),
            biases: network.biases().to_vec(),
        }
    }
}

impl TryFrom<Snapshot> for Network {
    type Error = crate::error::Error;

    fn try_from(snapshot: Snapshot) -> Result<Network> {
        Network::from_parameters(snapshot.sizes, snapshot.weights, snapshot.biases)
    }
}

pub fn save(network: &Network, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, &Snapshot::from(network))?;
    writer.flush()?;
    info!(path = %path.display(), sizes = ?network.sizes(), "saved network");
    Ok(())
}

/// Read a snapshot and rebuild the network, rejecting any parameter whose shape disagrees
/// with the stored sizes.
pub fn load(path: impl AsRef<Path>) -> Result<Network> {
    let path = path.as_ref();
    let snapshot: Snapshot = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    let network = Network::try_from(snapshot)?;
    info!(path = %path.display(), sizes = ?network.sizes(), "loaded network");
    Ok(network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ndarray::array;

    #[test]
    fn snapshot_with_wrong_shapes_is_rejected() {
        let snapshot = Snapshot {
            sizes: vec![3, 2],
            weights: vec![array![[1.0, 2.0], [3.0, 4.0]]],
            biases: vec![array![0.0, 0.0]],
        };
        assert!(matches!(
            Network::try_from(snapshot),
            Err(Error::ShapeMismatch {
                context: "weight columns",
                expected: 3,
                found: 2
            })
        ));
    }

    #[test]
    fn snapshot_json_contains_sizes() {
        let network = Network::from_parameters(
            vec![2, 1],
            vec![array![[0.5, -0.5]]],
            vec![array![0.25]],
        )
        .unwrap();
        let json = serde_json::to_string(&Snapshot::from(&network)).unwrap();
        assert!(json.contains("\"sizes\":[2,1]"));

        let parsed: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.weights, network.weights());
    }
}
