use std::io;

use thiserror::Error;

pub mod openai;

/// Errors that can occur when producing embeddings.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("embedding has {got} dimensions, expected {expected}")]
    InvalidDimension { expected: usize, got: usize },

    #[error("provider returned {got} embeddings for {expected} texts")]
    CountMismatch { expected: usize, got: usize },

    #[error("no API key found in ${0}")]
    MissingApiKey(String),

    #[error("embedding request failed: {0}")]
    Http(String),
}

/// Provider interface for generating fixed-dimension embeddings.
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for each input text, in input order.
    /// Implementations must return vectors with the requested `dim`.
    fn embed(&self, texts: &[String], dim: usize) -> Result<Vec<Vec<f32>>, EmbeddingError>;
}

/// Compute the cosine similarity between two equal-length vectors.
/// Returns 0.0 when either vector has zero norm or the dimensions differ.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() { return 0.0; }
    let mut dot = 0.0f64;
    let mut na = 0.0f64;
    let mut nb = 0.0f64;
    for (x, y) in a.iter().zip(b) {
        let x = *x as f64;
        let y = *y as f64;
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 { return 0.0; }
    (dot / (na.sqrt() * nb.sqrt())) as f32
}
