use serde_json::Map;
use serde_json::Value as Json;

use crate::config::{FieldMap, NeighborKeys};
use crate::error::{NeighborsError, Result};

/// What makes two entries "the same meaning".
///
/// Every entry has a gloss; entries mapped to a dictionary sense additionally
/// carry its id, and two entries sharing that id are equivalent even when
/// their gloss text differs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identity {
    Canonical { id: String, gloss: String },
    GlossOnly { gloss: String },
}

impl Identity {
    /// Build an identity, treating an empty id as absent.
    pub fn new(gloss: impl Into<String>, canonical_id: Option<String>) -> Self {
        let gloss = gloss.into();
        match canonical_id.filter(|id| !id.is_empty()) {
            Some(id) => Identity::Canonical { id, gloss },
            None => Identity::GlossOnly { gloss },
        }
    }

    pub fn gloss(&self) -> &str {
        match self {
            Identity::Canonical { gloss, .. } | Identity::GlossOnly { gloss } => gloss,
        }
    }

    pub fn canonical_id(&self) -> Option<&str> {
        match self {
            Identity::Canonical { id, .. } => Some(id),
            Identity::GlossOnly { .. } => None,
        }
    }
}

/// One selected neighbor as written back into the dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    pub label: String,
    /// Similarity rounded to three decimals.
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Position in the dataset and row/column in the similarity matrix.
    pub index: usize,
    pub label: String,
    pub identity: Identity,
    pub neighbors: Vec<Neighbor>,
}

impl Entry {
    pub fn new(index: usize, label: impl Into<String>, identity: Identity) -> Self {
        Self { index, label: label.into(), identity, neighbors: Vec::new() }
    }
}

/// Extract an [`Entry`] from every record using the configured pointers.
///
/// A record without a gloss string or label is fatal, since neither identity
/// nor output can be established for it.
pub fn extract_entries(records: &[Json], fields: &FieldMap) -> Result<Vec<Entry>> {
    let id_pointer = fields.canonical_id.as_deref().filter(|p| !p.is_empty());
    records
        .iter()
        .enumerate()
        .map(|(index, rec)| {
            if !rec.is_object() {
                return Err(NeighborsError::NotAnObject { index });
            }
            let gloss = rec
                .pointer(&fields.gloss)
                .and_then(Json::as_str)
                .ok_or_else(|| NeighborsError::MissingGloss { index, pointer: fields.gloss.clone() })?;
            let label = rec
                .pointer(&fields.label)
                .and_then(scalar_to_string)
                .ok_or_else(|| NeighborsError::MissingLabel { index, pointer: fields.label.clone() })?;
            let canonical_id = id_pointer.and_then(|p| rec.pointer(p)).and_then(scalar_to_string);
            Ok(Entry::new(index, label, Identity::new(gloss, canonical_id)))
        })
        .collect()
}

/// Overwrite `field` in each record with its entry's neighbor list, one
/// object per neighbor keyed by `keys`. Non-finite similarities become `null`.
pub fn write_neighbors(records: &mut [Json], entries: &[Entry], field: &str, keys: &NeighborKeys) -> Result<()> {
    let len = records.len();
    for entry in entries {
        let obj = records
            .get_mut(entry.index)
            .ok_or(NeighborsError::IndexOutOfRange { index: entry.index, len })?
            .as_object_mut()
            .ok_or(NeighborsError::NotAnObject { index: entry.index })?;
        let list = entry
            .neighbors
            .iter()
            .map(|n| {
                let mut item = Map::new();
                item.insert(keys.label.clone(), Json::String(n.label.clone()));
                item.insert(keys.similarity.clone(), Json::from(n.similarity));
                Json::Object(item)
            })
            .collect();
        obj.insert(field.to_string(), Json::Array(list));
    }
    Ok(())
}

// Dictionary ids show up as strings in some exports and integers in others.
fn scalar_to_string(v: &Json) -> Option<String> {
    match v {
        Json::String(s) => Some(s.clone()),
        Json::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
