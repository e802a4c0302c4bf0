use std::io;

use thiserror::Error;

use crate::embedding::EmbeddingError;

pub type Result<T> = std::result::Result<T, NeighborsError>;

/// Errors that abort a neighbor annotation run.
///
/// Entry-level variants carry the dataset index of the offending record.
#[derive(Debug, Error)]
pub enum NeighborsError {
    #[error("similarity matrix covers {matrix} entries but the dataset has {entries}")]
    DimensionMismatch { matrix: usize, entries: usize },

    #[error("similarity matrix row {index} has {got} columns, expected {expected}")]
    RaggedRow { index: usize, expected: usize, got: usize },

    #[error("similarity matrix declares {n}x{n} but holds {len} scores")]
    MatrixSize { n: usize, len: usize },

    #[error("entry {index} has no gloss text at `{pointer}`")]
    MissingGloss { index: usize, pointer: String },

    #[error("entry {index} has no display label at `{pointer}`")]
    MissingLabel { index: usize, pointer: String },

    #[error("entry {index} is not a JSON object")]
    NotAnObject { index: usize },

    #[error("entry index {index} is out of range for {len} entries")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid config: {0}")]
    Config(String),

    #[error(transparent)]
    Embedding(#[from] EmbeddingError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
