use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredIdx {
    pub idx: usize,
    pub score: f32,
}

/// Rank every index of `row` by descending score.
///
/// Ties keep ascending index order. Non-finite scores sort after every
/// finite one, so they are only reached once the finite candidates run out.
pub fn rank_descending(row: &[f32]) -> Vec<ScoredIdx> {
    let mut scored: Vec<ScoredIdx> = row
        .iter()
        .enumerate()
        .map(|(idx, &score)| ScoredIdx { idx, score })
        .collect();
    // Stable sort: equal keys stay in index order.
    scored.sort_by(|a, b| descending(a.score, b.score));
    scored
}

/// The `top_k` highest-scoring indices, in descending score order.
pub fn top_k(row: &[f32], top_k: usize) -> Vec<ScoredIdx> {
    if top_k == 0 || row.is_empty() { return Vec::new(); }
    let mut ranked = rank_descending(row);
    ranked.truncate(top_k);
    ranked
}

/// The `bottom_k` lowest finite scores, lowest first.
pub fn bottom_k(row: &[f32], bottom_k: usize) -> Vec<ScoredIdx> {
    let mut ranked = rank_descending(row);
    ranked.retain(|s| s.score.is_finite());
    ranked.reverse();
    ranked.truncate(bottom_k);
    ranked
}

pub fn count_non_finite(row: &[f32]) -> usize {
    row.iter().filter(|s| !s.is_finite()).count()
}

fn descending(a: f32, b: f32) -> Ordering {
    match (a.is_finite(), b.is_finite()) {
        (true, true) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn idxs(v: &[ScoredIdx]) -> Vec<usize> {
        v.iter().map(|s| s.idx).collect()
    }

    #[test]
    fn topk_basic() {
        let res = top_k(&[0.2, 0.9, 0.5], 2);
        assert_eq!(idxs(&res), vec![1, 2]);
        assert_eq!(res[0].score, 0.9);
    }

    #[test]
    fn ties_keep_index_order() {
        let ranked = rank_descending(&[0.5, 0.7, 0.5, 0.7]);
        assert_eq!(idxs(&ranked), vec![1, 3, 0, 2]);
    }

    #[test]
    fn non_finite_scores_rank_last() {
        let ranked = rank_descending(&[f32::NAN, -0.9, f32::INFINITY, 0.1]);
        assert_eq!(idxs(&ranked), vec![3, 1, 0, 2]);
        assert_eq!(count_non_finite(&[f32::NAN, -0.9, f32::INFINITY, 0.1]), 2);
    }

    #[test]
    fn bottom_k_skips_non_finite_and_starts_lowest() {
        let res = bottom_k(&[1.0, f32::NAN, -0.3, 0.4], 2);
        assert_eq!(idxs(&res), vec![2, 3]);
    }

    #[test]
    fn zero_or_empty_yields_nothing() {
        assert!(top_k(&[1.0], 0).is_empty());
        assert!(top_k(&[], 3).is_empty());
    }
}
