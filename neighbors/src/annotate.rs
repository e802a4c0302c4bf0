use tracing::info;

use crate::cache::{load_or_compute, MatrixCache};
use crate::config::NeighborsConfig;
use crate::embedding::EmbeddingProvider;
use crate::entry::{extract_entries, write_neighbors, Entry};
use crate::error::Result;
use crate::matrix::SimilarityMatrix;
use crate::report::{describe, NeighborReport};
use crate::select::assign_neighbors;
use crate::store::DatasetStore;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnnotateSummary {
    pub entries: usize,
    pub neighbors_written: usize,
    /// Entries that received fewer than `k` neighbors.
    pub short_lists: usize,
    /// Matrix rows that contained NaN or infinite scores.
    pub non_finite_rows: usize,
}

/// A dataset loaded from its store together with its similarity matrix.
pub struct LoadedDataset {
    pub records: Vec<serde_json::Value>,
    pub entries: Vec<Entry>,
    pub matrix: SimilarityMatrix,
}

/// Load records, extract entries and obtain a matrix whose index space
/// matches them.
pub fn load_dataset(
    store: &dyn DatasetStore,
    provider: &dyn EmbeddingProvider,
    config: &NeighborsConfig,
) -> Result<LoadedDataset> {
    let records = store.load()?;
    let entries = extract_entries(&records, &config.fields)?;
    info!(entries = entries.len(), "loaded dataset");

    let glosses: Vec<String> = entries.iter().map(|e| e.identity.gloss().to_string()).collect();
    let cache = config.matrix.cache.as_deref().map(|path| MatrixCache::new(path, &config.embedding));
    let matrix = load_or_compute(cache.as_ref(), provider, &glosses, config.embedding.dim)?;
    matrix.check_dimension(entries.len())?;
    Ok(LoadedDataset { records, entries, matrix })
}

/// Annotate every record with its distinct nearest neighbors and save the
/// dataset once all lists are computed. Nothing is written on error.
pub fn annotate_dataset(
    store: &dyn DatasetStore,
    provider: &dyn EmbeddingProvider,
    config: &NeighborsConfig,
) -> Result<AnnotateSummary> {
    config.validate()?;
    let LoadedDataset { mut records, mut entries, matrix } = load_dataset(store, provider, config)?;

    let non_finite_rows = assign_neighbors(&mut entries, &matrix, config.k)?;
    write_neighbors(&mut records, &entries, &config.output_field, &config.neighbor_keys)?;
    store.save(&records)?;

    let summary = AnnotateSummary {
        entries: entries.len(),
        neighbors_written: entries.iter().map(|e| e.neighbors.len()).sum(),
        short_lists: entries.iter().filter(|e| e.neighbors.len() < config.k).count(),
        non_finite_rows,
    };
    info!(
        entries = summary.entries,
        neighbors = summary.neighbors_written,
        short_lists = summary.short_lists,
        field = %config.output_field,
        "annotated dataset"
    );
    Ok(summary)
}

/// Nearest/farthest report for one entry of the dataset.
pub fn describe_dataset(
    store: &dyn DatasetStore,
    provider: &dyn EmbeddingProvider,
    config: &NeighborsConfig,
    index: usize,
    closest: usize,
    farthest: usize,
) -> Result<NeighborReport> {
    let loaded = load_dataset(store, provider, config)?;
    describe(&loaded.matrix, &loaded.entries, index, closest, farthest)
}
