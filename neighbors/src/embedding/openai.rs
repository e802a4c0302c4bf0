use reqwest::blocking::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::{EmbeddingError, EmbeddingProvider};
use crate::config::EmbeddingConfig;

/// Client for an OpenAI-compatible `/embeddings` endpoint.
///
/// The API key is read from the environment variable named in
/// [`EmbeddingConfig::api_key_env`] when the client is built; a missing key
/// only becomes an error once an embedding is actually requested, so a run
/// served entirely from the matrix cache never needs one.
pub struct OpenAiEmbeddingClient {
    base_url: String,
    model: String,
    batch_size: usize,
    api_key_env: String,
    api_key: Option<String>,
    http: Client,
}

impl OpenAiEmbeddingClient {
    pub fn from_config(cfg: &EmbeddingConfig) -> Self {
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::with_api_key(cfg, api_key)
    }

    pub fn with_api_key(cfg: &EmbeddingConfig, api_key: Option<String>) -> Self {
        let mut base_url = cfg.base_url.clone();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            base_url,
            model: cfg.model.clone(),
            batch_size: cfg.batch_size.max(1),
            api_key_env: cfg.api_key_env.clone(),
            api_key,
            http: Client::new(),
        }
    }

    fn embeddings_url(&self) -> String {
        format!("{}/embeddings", self.base_url)
    }

    fn embed_batch(&self, api_key: &str, batch: &[String], dim: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let payload = EmbeddingRequest { model: &self.model, dimensions: dim, input: batch };
        let resp = self
            .http
            .post(self.embeddings_url())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .map_err(|e| EmbeddingError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            return Err(EmbeddingError::Http(format!("HTTP {status}: {body}")));
        }

        let mut parsed: EmbeddingResponse = resp
            .json()
            .map_err(|e| EmbeddingError::Http(format!("decode failed: {e}")))?;
        if parsed.data.len() != batch.len() {
            return Err(EmbeddingError::CountMismatch { expected: batch.len(), got: parsed.data.len() });
        }
        parsed.data.sort_by_key(|d| d.index);

        let mut out = Vec::with_capacity(parsed.data.len());
        for d in parsed.data {
            if d.embedding.len() != dim {
                return Err(EmbeddingError::InvalidDimension { expected: dim, got: d.embedding.len() });
            }
            out.push(d.embedding);
        }
        Ok(out)
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    dimensions: usize,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

impl EmbeddingProvider for OpenAiEmbeddingClient {
    fn embed(&self, texts: &[String], dim: usize) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() { return Ok(Vec::new()); }
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(EmbeddingError::MissingApiKey(self.api_key_env.clone()));
        };

        let mut out = Vec::with_capacity(texts.len());
        for (n, batch) in texts.chunks(self.batch_size).enumerate() {
            debug!(batch = n, size = batch.len(), model = %self.model, "requesting embeddings");
            out.extend(self.embed_batch(api_key, batch, dim)?);
        }
        Ok(out)
    }
}
