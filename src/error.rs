use std::io;

use thiserror::Error;

/// Everything that can abort a network operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error("shape mismatch in {context}: expected {expected}, found {found}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("label {label} is outside [0, {num_classes})")]
    InvalidLabel { label: usize, num_classes: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("batch contains no examples")]
    EmptyBatch,

    #[error("malformed data: {0}")]
    MalformedData(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
