//! Annotates vocabulary entries with their most similar *distinct* peers.
//!
//! Given a pairwise similarity matrix over entry glosses, every entry gets an
//! ordered, size-bounded neighbor list that never repeats a meaning: entries
//! sharing a dictionary sense id or an identical gloss count once, and never
//! when they share the query's own identity.

pub mod annotate;
pub mod cache;
pub mod config;
pub mod embedding;
pub mod entry;
pub mod error;
pub mod knn;
pub mod matrix;
pub mod report;
pub mod select;
pub mod store;

pub use annotate::{annotate_dataset, describe_dataset, AnnotateSummary};
pub use config::NeighborsConfig;
pub use entry::{Entry, Identity, Neighbor};
pub use error::{NeighborsError, Result};
pub use matrix::SimilarityMatrix;
pub use select::{assign_neighbors, select_neighbors};
