//! Top-k distinct neighbor selection.
//!
//! For a query entry, every other entry is ranked by similarity and the
//! ranking is walked once, emitting neighbors while a running set of
//! excluded identities grows. An entry that shares a canonical id or gloss
//! with the query, or with anything already walked past, is skipped, and its
//! own keys join the set so chains of paraphrases collapse onto the first
//! (most similar) member.

use std::collections::HashSet;

use rayon::prelude::*;
use tracing::warn;

use crate::entry::{Entry, Identity, Neighbor};
use crate::error::{NeighborsError, Result};
use crate::knn::{count_non_finite, rank_descending};
use crate::matrix::SimilarityMatrix;

/// Identity keys that can no longer be emitted for the current query.
#[derive(Debug, Default)]
struct ExcludedIdentities<'a> {
    ids: HashSet<&'a str>,
    glosses: HashSet<&'a str>,
}

impl<'a> ExcludedIdentities<'a> {
    fn seeded_with(identity: &'a Identity) -> Self {
        let mut set = Self::default();
        set.register(identity);
        set
    }

    fn contains(&self, identity: &Identity) -> bool {
        match identity {
            Identity::Canonical { id, gloss } => {
                self.ids.contains(id.as_str()) || self.glosses.contains(gloss.as_str())
            }
            Identity::GlossOnly { gloss } => self.glosses.contains(gloss.as_str()),
        }
    }

    fn register(&mut self, identity: &'a Identity) {
        if let Identity::Canonical { id, .. } = identity {
            self.ids.insert(id);
        }
        self.glosses.insert(identity.gloss());
    }
}

/// Select up to `k` distinct-meaning neighbors of entry `i` from its
/// similarity `row`, most similar first.
///
/// `row` must have one score per entry. The returned similarities are
/// rounded to three decimals; ranking uses the unrounded scores.
pub fn select_neighbors(i: usize, row: &[f32], entries: &[Entry], k: usize) -> Result<Vec<Neighbor>> {
    let query = entries
        .get(i)
        .ok_or(NeighborsError::IndexOutOfRange { index: i, len: entries.len() })?;
    if row.len() != entries.len() {
        return Err(NeighborsError::RaggedRow { index: i, expected: entries.len(), got: row.len() });
    }

    let mut excluded = ExcludedIdentities::seeded_with(&query.identity);
    let mut out = Vec::with_capacity(k);
    for candidate in rank_descending(row) {
        if out.len() >= k {
            break;
        }
        if candidate.idx == i {
            continue;
        }
        let entry = &entries[candidate.idx];
        let seen = excluded.contains(&entry.identity);
        excluded.register(&entry.identity);
        if seen {
            continue;
        }
        out.push(Neighbor { label: entry.label.clone(), similarity: round3(candidate.score) });
    }
    Ok(out)
}

/// Fill `neighbors` for every entry from `matrix`.
///
/// The matrix dimension is checked before any work starts. Entries are
/// processed in parallel; each list is computed from shared read-only data
/// and only assigned once all of them succeeded. Returns the number of rows
/// that contained non-finite scores.
pub fn assign_neighbors(entries: &mut [Entry], matrix: &SimilarityMatrix, k: usize) -> Result<usize> {
    if k == 0 {
        return Err(NeighborsError::Config("k must be at least 1".to_string()));
    }
    matrix.check_dimension(entries.len())?;

    let shared: &[Entry] = entries;
    let lists: Vec<(Vec<Neighbor>, bool)> = (0..shared.len())
        .into_par_iter()
        .map(|i| {
            let row = matrix.row(i);
            let bad = count_non_finite(row);
            if bad > 0 {
                warn!(index = i, count = bad, "non-finite similarity scores ranked last");
            }
            select_neighbors(i, row, shared, k).map(|list| (list, bad > 0))
        })
        .collect::<Result<_>>()?;

    let mut bad_rows = 0;
    for (entry, (list, bad)) in entries.iter_mut().zip(lists) {
        entry.neighbors = list;
        bad_rows += usize::from(bad);
    }
    Ok(bad_rows)
}

// Half-to-even, like Python's `round(x, 3)`. The product is exact for any f32.
fn round3(score: f32) -> f64 {
    (f64::from(score) * 1000.0).round_ties_even() / 1000.0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry(index: usize, gloss: &str, id: Option<&str>) -> Entry {
        Entry::new(index, format!("entry{index}"), Identity::new(gloss, id.map(str::to_string)))
    }

    fn labels(list: &[Neighbor]) -> Vec<&str> {
        list.iter().map(|n| n.label.as_str()).collect()
    }

    #[test]
    fn paraphrase_chain_is_excluded_transitively() {
        // 1 shares an id with the query; 2 shares 1's gloss but has no id.
        // 2 must be skipped even though its own keys never matched the query.
        let entries = vec![
            entry(0, "woman", Some("X")),
            entry(1, "female person", Some("X")),
            entry(2, "female person", None),
            entry(3, "girl", None),
        ];
        let row = [1.0, 0.95, 0.9, 0.7];
        let out = select_neighbors(0, &row, &entries, 3).unwrap();
        assert_eq!(labels(&out), vec!["entry3"]);
    }

    #[test]
    fn emitted_identity_blocks_later_duplicates() {
        let entries = vec![
            entry(0, "sky", None),
            entry(1, "sea", Some("S")),
            entry(2, "ocean", Some("S")),
            entry(3, "lake", None),
        ];
        let row = [1.0, 0.8, 0.7, 0.6];
        let out = select_neighbors(0, &row, &entries, 3).unwrap();
        assert_eq!(labels(&out), vec!["entry1", "entry3"]);
    }

    #[test]
    fn gloss_only_candidate_does_not_match_on_missing_id() {
        let entries = vec![entry(0, "a", Some("X")), entry(1, "b", None), entry(2, "c", None)];
        let out = select_neighbors(0, &[1.0, 0.5, 0.4], &entries, 5).unwrap();
        assert_eq!(labels(&out), vec!["entry1", "entry2"]);
    }

    #[test]
    fn self_is_skipped_even_when_not_ranked_first() {
        let entries = vec![entry(0, "a", None), entry(1, "b", None)];
        let out = select_neighbors(0, &[0.5, 0.9], &entries, 2).unwrap();
        assert_eq!(out, vec![Neighbor { label: "entry1".into(), similarity: 0.9 }]);
    }

    #[test]
    fn similarity_is_rounded_to_three_decimals() {
        let entries = vec![entry(0, "a", None), entry(1, "b", None), entry(2, "c", None)];
        let out = select_neighbors(0, &[1.0, 0.123_56, 0.123_54], &entries, 2).unwrap();
        assert_eq!(out[0].similarity, 0.124);
        assert_eq!(out[1].similarity, 0.124);
        assert_eq!(labels(&out), vec!["entry1", "entry2"]);
    }

    #[test]
    fn exact_halves_round_to_even() {
        assert_eq!(round3(0.0625), 0.062);
        assert_eq!(round3(0.1875), 0.188);
        assert_eq!(round3(-0.0625), -0.062);
    }

    #[test]
    fn non_finite_candidates_only_fill_remaining_slots() {
        let entries = vec![entry(0, "a", None), entry(1, "b", None), entry(2, "c", None)];
        let row = [1.0, f32::NAN, -0.2];
        let out = select_neighbors(0, &row, &entries, 1).unwrap();
        assert_eq!(labels(&out), vec!["entry2"]);

        let out = select_neighbors(0, &row, &entries, 2).unwrap();
        assert_eq!(labels(&out), vec!["entry2", "entry1"]);
        assert!(out[1].similarity.is_nan());
    }

    #[test]
    fn row_length_must_match_entries() {
        let entries = vec![entry(0, "a", None), entry(1, "b", None)];
        let err = select_neighbors(0, &[1.0], &entries, 1).unwrap_err();
        assert!(matches!(err, NeighborsError::RaggedRow { index: 0, expected: 2, got: 1 }));
        let err = select_neighbors(5, &[1.0, 0.0], &entries, 1).unwrap_err();
        assert!(matches!(err, NeighborsError::IndexOutOfRange { index: 5, len: 2 }));
    }

    #[test]
    fn assign_rejects_mismatched_matrix_before_selecting() {
        let mut entries = vec![entry(0, "a", None), entry(1, "b", None)];
        let matrix = SimilarityMatrix::from_rows(vec![vec![1.0]]).unwrap();
        let err = assign_neighbors(&mut entries, &matrix, 1).unwrap_err();
        assert!(matches!(err, NeighborsError::DimensionMismatch { matrix: 1, entries: 2 }));
        assert!(entries.iter().all(|e| e.neighbors.is_empty()));
    }

    #[test]
    fn assign_counts_rows_with_non_finite_scores() {
        let mut entries = vec![entry(0, "a", None), entry(1, "b", None)];
        let matrix = SimilarityMatrix::from_rows(vec![vec![1.0, f32::NAN], vec![0.3, 1.0]]).unwrap();
        let bad = assign_neighbors(&mut entries, &matrix, 1).unwrap();
        assert_eq!(bad, 1);
        assert_eq!(entries[1].neighbors, vec![Neighbor { label: "entry0".into(), similarity: 0.3 }]);
    }
}
