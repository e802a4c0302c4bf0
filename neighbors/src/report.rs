use std::fmt;

use crate::entry::Entry;
use crate::error::{NeighborsError, Result};
use crate::knn::{bottom_k, top_k};
use crate::matrix::SimilarityMatrix;

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub index: usize,
    pub score: f32,
    pub label: String,
    pub gloss: String,
}

/// Nearest and farthest entries relative to one entry, for eyeballing
/// whether the similarity matrix makes sense. No deduplication is applied
/// and the entry itself usually tops the closest list.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborReport {
    pub index: usize,
    pub closest: Vec<ReportLine>,
    pub farthest: Vec<ReportLine>,
}

/// Report the `closest` highest and `farthest` lowest scoring entries of row
/// `index`.
pub fn describe(
    matrix: &SimilarityMatrix,
    entries: &[Entry],
    index: usize,
    closest: usize,
    farthest: usize,
) -> Result<NeighborReport> {
    matrix.check_dimension(entries.len())?;
    if index >= entries.len() {
        return Err(NeighborsError::IndexOutOfRange { index, len: entries.len() });
    }
    let row = matrix.row(index);
    let line = |s: crate::knn::ScoredIdx| {
        let e = &entries[s.idx];
        ReportLine { index: s.idx, score: s.score, label: e.label.clone(), gloss: e.identity.gloss().to_string() }
    };
    Ok(NeighborReport {
        index,
        closest: top_k(row, closest).into_iter().map(line).collect(),
        farthest: bottom_k(row, farthest).into_iter().map(line).collect(),
    })
}

impl fmt::Display for ReportLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2} => {} {}", self.score, self.label, self.gloss)
    }
}

impl fmt::Display for NeighborReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Closest to #{}", self.index)?;
        for l in &self.closest {
            writeln!(f, "{l}")?;
        }
        writeln!(f)?;
        writeln!(f, "## Farthest from #{}", self.index)?;
        for l in &self.farthest {
            writeln!(f, "{l}")?;
        }
        Ok(())
    }
}
