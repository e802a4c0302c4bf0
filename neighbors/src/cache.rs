use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha1::Digest;
use tracing::{info, warn};

use crate::config::EmbeddingConfig;
use crate::embedding::{EmbeddingError, EmbeddingProvider};
use crate::error::Result;
use crate::matrix::SimilarityMatrix;
use crate::store::{open_shared, write_atomically};

/// On-disk form of a cached similarity matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedMatrix {
    fingerprint: String,
    model: String,
    dim: usize,
    n: usize,
    scores: Vec<f32>,
}

/// SHA-1 over the embedding model, its dimension and the ordered gloss
/// texts. Every string is length-prefixed so that `["ab", "c"]` and
/// `["a", "bc"]` differ.
pub fn matrix_fingerprint(model: &str, dim: usize, glosses: &[String]) -> String {
    let mut hasher = sha1::Sha1::new();
    hasher.update((model.len() as u64).to_le_bytes());
    hasher.update(model.as_bytes());
    hasher.update((dim as u64).to_le_bytes());
    for g in glosses {
        hasher.update((g.len() as u64).to_le_bytes());
        hasher.update(g.as_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Similarity matrix persisted between runs, keyed by the embedding model
/// and the glosses it was computed from.
#[derive(Debug, Clone)]
pub struct MatrixCache {
    path: PathBuf,
    model: String,
    dim: usize,
}

impl MatrixCache {
    pub fn new(path: &Path, embedding: &EmbeddingConfig) -> Self {
        Self { path: path.to_path_buf(), model: embedding.model.clone(), dim: embedding.dim }
    }

    fn fingerprint(&self, glosses: &[String]) -> String {
        matrix_fingerprint(&self.model, self.dim, glosses)
    }

    /// Return the cached matrix when it was built by this model from exactly
    /// `glosses`.
    pub fn load(&self, glosses: &[String]) -> std::io::Result<Option<SimilarityMatrix>> {
        let file = match open_shared(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e),
        };
        let cached: CachedMatrix = match serde_json::from_reader(BufReader::new(&file)) {
            Ok(c) => c,
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring unreadable matrix cache: {e}");
                return Ok(None);
            }
        };
        if cached.n != glosses.len() || cached.fingerprint != self.fingerprint(glosses) {
            warn!(
                path = %self.path.display(),
                cached_model = %cached.model,
                cached_dim = cached.dim,
                cached = cached.n,
                current = glosses.len(),
                "matrix cache is stale"
            );
            return Ok(None);
        }
        match SimilarityMatrix::from_flat(cached.n, cached.scores) {
            Ok(m) => Ok(Some(m)),
            Err(e) => {
                warn!(path = %self.path.display(), "ignoring malformed matrix cache: {e}");
                Ok(None)
            }
        }
    }

    pub fn save(&self, glosses: &[String], matrix: &SimilarityMatrix) -> std::io::Result<()> {
        let cached = CachedMatrix {
            fingerprint: self.fingerprint(glosses),
            model: self.model.clone(),
            dim: self.dim,
            n: matrix.len(),
            scores: matrix.as_flat().to_vec(),
        };
        let data = serde_json::to_vec(&cached)
            .map_err(|e| std::io::Error::other(format!("serialize matrix cache failed: {e}")))?;
        write_atomically(&self.path, &data)
    }
}

/// Embed `glosses` and build their pairwise cosine similarity matrix.
pub fn compute_matrix(provider: &dyn EmbeddingProvider, glosses: &[String], dim: usize) -> Result<SimilarityMatrix> {
    let embeddings = provider.embed(glosses, dim)?;
    if embeddings.len() != glosses.len() {
        return Err(EmbeddingError::CountMismatch { expected: glosses.len(), got: embeddings.len() }.into());
    }
    Ok(SimilarityMatrix::from_embeddings(&embeddings))
}

/// Use the cache when it matches `glosses`, otherwise compute through
/// `provider` and refresh the cache.
pub fn load_or_compute(
    cache: Option<&MatrixCache>,
    provider: &dyn EmbeddingProvider,
    glosses: &[String],
    dim: usize,
) -> Result<SimilarityMatrix> {
    if let Some(cache) = cache {
        if let Some(m) = cache.load(glosses)? {
            info!(path = %cache.path.display(), n = m.len(), "loaded similarity matrix from cache");
            return Ok(m);
        }
    }

    info!(n = glosses.len(), dim, "computing similarity matrix");
    let matrix = compute_matrix(provider, glosses, dim)?;
    if let Some(cache) = cache {
        cache.save(glosses, &matrix)?;
        info!(path = %cache.path.display(), "saved similarity matrix cache");
    }
    Ok(matrix)
}
