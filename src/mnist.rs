use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use itertools::Itertools;
use ndarray::Array1;
use tracing::info;

use crate::data::{Dataset, Example};
use crate::error::{Error, Result};

const IMAGE_MAGIC: u32 = 2051;
const LABEL_MAGIC: u32 = 2049;

pub const TRAIN_IMAGES: &str = "train-images-idx3-ubyte.gz";
pub const TRAIN_LABELS: &str = "train-labels-idx1-ubyte.gz";
pub const TEST_IMAGES: &str = "t10k-images-idx3-ubyte.gz";
pub const TEST_LABELS: &str = "t10k-labels-idx1-ubyte.gz";

/// Load the four gzipped IDX files found in `dir` into a train/test dataset. Pixel
/// intensities are scaled from `0..=255` into `[0.0, 1.0]`.
pub fn load(dir: impl AsRef<Path>) -> Result<Dataset> {
    let dir = dir.as_ref();
    let train = read_examples(&dir.join(TRAIN_IMAGES), &dir.join(TRAIN_LABELS))?;
    let test = read_examples(&dir.join(TEST_IMAGES), &dir.join(TEST_LABELS))?;
    info!(
        train = train.len(),
        test = test.len(),
        dir = %dir.display(),
        "loaded MNIST"
    );
    Ok(Dataset::new(train, test))
}

pub fn read_examples(image_path: &Path, label_path: &Path) -> Result<Vec<Example>> {
    images_and_labels_to_examples(read_bytes(image_path)?, read_bytes(label_path)?)
}

fn read_bytes(path: &Path) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    GzDecoder::new(File::open(path)?).read_to_end(&mut bytes)?;
    Ok(bytes)
}

// Read `count` big-endian u32 headers off the front of an IDX byte iterator.
fn read_headers(bytes: &mut impl Iterator<Item = u8>, count: usize) -> Result<Vec<u32>> {
    let header_bytes = bytes.take(count * 4).collect::<Vec<_>>();
    if header_bytes.len() != count * 4 {
        return Err(Error::MalformedData("truncated IDX header".to_string()));
    }
    Ok(header_bytes
        .chunks_exact(4)
        .map(|chunk| {
            let word = [chunk[0], chunk[1], chunk[2], chunk[3]];
            u32::from_be_bytes(word)
        })
        .collect())
}

fn images_and_labels_to_examples(
    image_bytes: Vec<u8>,
    label_bytes: Vec<u8>,
) -> Result<Vec<Example>> {
    let mut image_bytes_iter = image_bytes.into_iter();
    let mut label_bytes_iter = label_bytes.into_iter();

    // Image headers: magic number, image count, rows, columns.
    let image_headers = read_headers(&mut image_bytes_iter, 4)?;
    if image_headers[0] != IMAGE_MAGIC {
        return Err(Error::MalformedData(format!(
            "image file magic number {} (expected {IMAGE_MAGIC})",
            image_headers[0]
        )));
    }
    let images = image_headers[1] as usize;
    let pixels = image_headers[2] as usize * image_headers[3] as usize;

    // Label headers: magic number, label count.
    let label_headers = read_headers(&mut label_bytes_iter, 2)?;
    if label_headers[0] != LABEL_MAGIC {
        return Err(Error::MalformedData(format!(
            "label file magic number {} (expected {LABEL_MAGIC})",
            label_headers[0]
        )));
    }
    let labels = label_headers[1] as usize;

    if images != labels {
        return Err(Error::MalformedData(format!("{images} images but {labels} labels")));
    }
    if pixels == 0 {
        return Err(Error::MalformedData("images have no pixels".to_string()));
    }

    let mut examples = Vec::with_capacity(images);
    for (image_chunk, label) in image_bytes_iter
        .chunks(pixels)
        .into_iter()
        .zip(label_bytes_iter)
        .take(images)
    {
        let input = image_chunk
            .map(|value| value as f64 / 255.0)
            .collect::<Array1<f64>>();
        if input.len() != pixels {
            return Err(Error::MalformedData("truncated image data".to_string()));
        }
        examples.push(Example::new(input, label as usize));
    }

    if examples.len() != images {
        return Err(Error::MalformedData(format!(
            "expected {images} examples, read {}",
            examples.len()
        )));
    }
    Ok(examples)
}
