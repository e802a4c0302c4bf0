use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value as Json;
use serde_json::ser::PrettyFormatter;

use super::{open_shared, write_atomically, DatasetStore};

/// Dataset stored as one JSON array, e.g. the vocabulary `table.json`.
///
/// Written back with one-space indentation and non-ASCII text left as is,
/// so diffs against the exporter's own output stay small.
#[derive(Debug, Clone)]
pub struct JsonArrayStore {
    path: PathBuf,
}

impl JsonArrayStore {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf() }
    }
}

impl DatasetStore for JsonArrayStore {
    fn load(&self) -> std::io::Result<Vec<Json>> {
        let file = open_shared(&self.path)?;
        serde_json::from_reader(BufReader::new(&file)).map_err(|e| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("{}: expected a JSON array of records: {e}", self.path.display()),
            )
        })
    }

    fn save(&self, records: &[Json]) -> std::io::Result<()> {
        let mut buf = Vec::new();
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(b" "));
        records
            .serialize(&mut ser)
            .map_err(|e| std::io::Error::other(format!("serialize dataset failed: {e}")))?;
        write_atomically(&self.path, &buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn save_preserves_key_order_and_unicode() {
        let tmp = TempDir::new().unwrap();
        let store = JsonArrayStore::new(&tmp.path().join("table.json"));
        let records = vec![json!({"card": {"kanji": "女"}, "glossStr": "woman", "closest": []})];
        store.save(&records).unwrap();

        let text = std::fs::read_to_string(tmp.path().join("table.json")).unwrap();
        assert!(text.contains("\"kanji\": \"女\""));
        assert!(text.find("card").unwrap() < text.find("glossStr").unwrap());
        assert!(text.contains("\n {\n  \"card\""));
        assert_eq!(store.load().unwrap(), records);
    }

    #[test]
    fn non_array_document_is_invalid_data() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("table.json");
        std::fs::write(&path, r#"{"not": "an array"}"#).unwrap();
        let err = JsonArrayStore::new(&path).load().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }

    #[test]
    fn missing_file_is_not_found() {
        let tmp = TempDir::new().unwrap();
        let err = JsonArrayStore::new(&tmp.path().join("absent.json")).load().unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::NotFound);
    }
}
