//! Configuration for a neighbor annotation run.
//!
//! Every field has a default matching the `table.json` layout produced by the
//! vocabulary export, so an empty (or absent) TOML file is a valid config.

use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{NeighborsError, Result};

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct NeighborsConfig {
    /// Maximum number of neighbors written per entry.
    pub k: usize,

    /// Record field that receives the neighbor list (overwritten each run).
    pub output_field: String,

    pub fields: FieldMap,

    pub neighbor_keys: NeighborKeys,

    pub embedding: EmbeddingConfig,

    pub matrix: MatrixConfig,
}

impl Default for NeighborsConfig {
    fn default() -> Self {
        Self {
            k: 5,
            output_field: "closest".to_string(),
            fields: FieldMap::default(),
            neighbor_keys: NeighborKeys::default(),
            embedding: EmbeddingConfig::default(),
            matrix: MatrixConfig::default(),
        }
    }
}

/// JSON pointers (RFC 6901) locating the identity fields inside a record.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct FieldMap {
    pub label: String,
    pub gloss: String,
    /// Optional dictionary sense id; records without it fall back to gloss
    /// equality only. An empty pointer disables canonical ids entirely.
    pub canonical_id: Option<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            label: "/card/kanji".to_string(),
            gloss: "/glossStr".to_string(),
            canonical_id: Some("/glossObj/id".to_string()),
        }
    }
}

/// Key names of each object in the written neighbor list. The defaults
/// produce `{"kanji": ..., "distance": ...}`, which is what `table.json`
/// consumers read.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct NeighborKeys {
    pub label: String,
    pub similarity: String,
}

impl Default for NeighborKeys {
    fn default() -> Self {
        Self { label: "kanji".to_string(), similarity: "distance".to_string() }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct EmbeddingConfig {
    pub base_url: String,
    pub model: String,
    pub dim: usize,
    /// Number of texts sent per embeddings request.
    pub batch_size: usize,
    /// Environment variable holding the bearer token.
    pub api_key_env: String,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            model: "text-embedding-3-small".to_string(),
            dim: 384,
            batch_size: 64,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct MatrixConfig {
    /// Where the computed similarity matrix is cached between runs.
    pub cache: Option<PathBuf>,
}

impl NeighborsConfig {
    /// Load from a TOML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let cfg: Self = toml::from_str(&text)
            .map_err(|e| NeighborsError::Config(format!("{}: {e}", path.display())))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        let cfg: Self = toml::from_str(text).map_err(|e| NeighborsError::Config(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(NeighborsError::Config("k must be at least 1".to_string()));
        }
        if self.output_field.is_empty() {
            return Err(NeighborsError::Config("output-field must not be empty".to_string()));
        }
        let keys = &self.neighbor_keys;
        if keys.label.is_empty() || keys.similarity.is_empty() {
            return Err(NeighborsError::Config("neighbor-keys must not be empty".to_string()));
        }
        if keys.label == keys.similarity {
            return Err(NeighborsError::Config("neighbor-keys.label and neighbor-keys.similarity must differ".to_string()));
        }
        if self.embedding.dim == 0 {
            return Err(NeighborsError::Config("embedding.dim must be at least 1".to_string()));
        }
        if self.embedding.batch_size == 0 {
            return Err(NeighborsError::Config("embedding.batch-size must be at least 1".to_string()));
        }
        Ok(())
    }
}
