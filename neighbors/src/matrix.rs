use rayon::prelude::*;

use crate::embedding::cosine_similarity;
use crate::error::{NeighborsError, Result};

/// Dense N×N similarity scores, row-major. Read-only once built.
#[derive(Debug, Clone, PartialEq)]
pub struct SimilarityMatrix {
    n: usize,
    scores: Vec<f32>,
}

impl SimilarityMatrix {
    /// Build from a flat row-major buffer of `n * n` scores.
    pub fn from_flat(n: usize, scores: Vec<f32>) -> Result<Self> {
        if n.checked_mul(n) != Some(scores.len()) {
            return Err(NeighborsError::MatrixSize { n, len: scores.len() });
        }
        Ok(Self { n, scores })
    }

    /// Build from explicit rows; every row must have exactly `rows.len()` columns.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> Result<Self> {
        let n = rows.len();
        let mut scores = Vec::with_capacity(n * n);
        for (index, row) in rows.into_iter().enumerate() {
            if row.len() != n {
                return Err(NeighborsError::RaggedRow { index, expected: n, got: row.len() });
            }
            scores.extend(row);
        }
        Ok(Self { n, scores })
    }

    /// Pairwise cosine similarity of `embeddings`, computed once per pair.
    pub fn from_embeddings(embeddings: &[Vec<f32>]) -> Self {
        let n = embeddings.len();
        let upper: Vec<Vec<f32>> = (0..n)
            .into_par_iter()
            .map(|i| (i..n).map(|j| cosine_similarity(&embeddings[i], &embeddings[j])).collect())
            .collect();
        let mut scores = vec![0.0f32; n * n];
        for (i, row) in upper.into_iter().enumerate() {
            for (offset, s) in row.into_iter().enumerate() {
                let j = i + offset;
                scores[i * n + j] = s;
                scores[j * n + i] = s;
            }
        }
        Self { n, scores }
    }

    /// Number of entries covered (rows == columns).
    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn row(&self, i: usize) -> &[f32] {
        &self.scores[i * self.n..(i + 1) * self.n]
    }

    pub fn score(&self, i: usize, j: usize) -> f32 {
        self.scores[i * self.n + j]
    }

    pub fn as_flat(&self) -> &[f32] {
        &self.scores
    }

    /// Fails unless the matrix index space matches a dataset of `entries`.
    pub fn check_dimension(&self, entries: usize) -> Result<()> {
        if self.n != entries {
            return Err(NeighborsError::DimensionMismatch { matrix: self.n, entries });
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn embeddings_produce_symmetric_matrix_with_unit_diagonal() {
        let m = SimilarityMatrix::from_embeddings(&[
            vec![1.0, 0.0],
            vec![0.6, 0.8],
            vec![0.0, 1.0],
        ]);
        assert_eq!(m.len(), 3);
        for i in 0..3 {
            assert!((m.score(i, i) - 1.0).abs() < 1e-6);
            for j in 0..3 {
                assert_eq!(m.score(i, j), m.score(j, i));
            }
        }
        assert!((m.score(0, 1) - 0.6).abs() < 1e-6);
        assert!(m.score(0, 2).abs() < 1e-6);
    }

    #[test]
    fn ragged_rows_are_rejected_with_row_index() {
        let err = SimilarityMatrix::from_rows(vec![vec![1.0, 0.5], vec![0.5]]).unwrap_err();
        assert!(matches!(err, NeighborsError::RaggedRow { index: 1, expected: 2, got: 1 }));
    }

    #[test]
    fn dimension_check_compares_against_entry_count() {
        let m = SimilarityMatrix::from_rows(vec![vec![1.0]]).unwrap();
        assert!(m.check_dimension(1).is_ok());
        let err = m.check_dimension(2).unwrap_err();
        assert!(matches!(err, NeighborsError::DimensionMismatch { matrix: 1, entries: 2 }));
    }

    #[test]
    fn flat_buffer_must_be_square() {
        assert!(SimilarityMatrix::from_flat(2, vec![1.0, 0.2, 0.2, 1.0]).is_ok());
        assert!(SimilarityMatrix::from_flat(2, vec![1.0, 0.2, 0.2]).is_err());
        assert!(SimilarityMatrix::from_flat(0, Vec::new()).unwrap().is_empty());
    }
}
