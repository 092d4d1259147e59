use std::fs;
use std::path::PathBuf;

use ndarray::array;
use ndarray_rand::rand::{SeedableRng, rngs::StdRng};
use sigmoid_digits::{Error, Example, Network, persist};

fn scratch_path(name: &str) -> PathBuf {
    let file = format!("sigmoid-digits-{}-{name}", std::process::id());
    std::env::temp_dir().join(file)
}

#[test]
fn saved_network_predicts_identically_after_loading() {
    let mut rng = StdRng::seed_from_u64(99);
    let mut network = Network::with_rng(vec![4, 3, 2], &mut rng).unwrap();
    let batch = vec![
        Example::new(array![0.3, 0.1, 0.4, 0.1], 0),
        Example::new(array![0.5, 0.9, 0.2, 0.6], 1),
    ];
    // Give the velocities something to forget.
    let gradients = network.back_prop(&batch).unwrap();
    network
        .update_wb_momentum(&gradients, 0.5, 0.9, batch.len())
        .unwrap();

    let path = scratch_path("roundtrip.json");
    persist::save(&network, &path).unwrap();
    let loaded = persist::load(&path).unwrap();
    fs::remove_file(&path).unwrap();

    assert_eq!(loaded.sizes(), network.sizes());
    assert_eq!(loaded.weights(), network.weights());
    assert_eq!(loaded.biases(), network.biases());
    for velocity in loaded.velocity_weights() {
        assert!(velocity.iter().all(|&x| x == 0.0));
    }

    let expected = network.feed_forward(&batch, true).unwrap().outputs;
    let found = loaded.feed_forward(&batch, true).unwrap().outputs;
    assert_eq!(found, expected);
}

#[test]
fn inconsistent_file_is_rejected() {
    let path = scratch_path("inconsistent.json");
    // One output row where the sizes call for two.
    let weights = r#"[{"v":1,"dim":[1,2],"data":[0.1,0.2]}]"#;
    let biases = r#"[{"v":1,"dim":[1],"data":[0.0]}]"#;
    let json = format!(r#"{{"sizes":[2,2],"weights":{weights},"biases":{biases}}}"#);
    fs::write(&path, json).unwrap();
    let result = persist::load(&path);
    fs::remove_file(&path).unwrap();

    assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
}

#[test]
fn missing_and_garbled_files_fail() {
    let result = persist::load(scratch_path("absent.json"));
    assert!(matches!(result, Err(Error::Io(_))));

    let path = scratch_path("garbled.json");
    fs::write(&path, "not json").unwrap();
    let result = persist::load(&path);
    fs::remove_file(&path).unwrap();
    assert!(matches!(result, Err(Error::Serialization(_))));
}
