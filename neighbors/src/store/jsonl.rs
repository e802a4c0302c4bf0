use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use serde_json::Value as Json;

use super::{open_shared, write_atomically, DatasetStore};

/// Dataset stored one record per line.
///
/// Unlike an append-only log, every line is a dataset index: a line that
/// fails to parse is an error rather than skipped, and blank lines are the
/// only ones ignored.
#[derive(Debug, Clone)]
pub struct JsonlDatasetStore {
    path: PathBuf,
}

impl JsonlDatasetStore {
    pub fn new(path: &Path) -> Self {
        Self { path: path.to_path_buf() }
    }
}

impl DatasetStore for JsonlDatasetStore {
    fn load(&self) -> std::io::Result<Vec<Json>> {
        let file = open_shared(&self.path)?;
        let reader = BufReader::new(&file);
        let mut out = Vec::new();
        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() { continue; }
            let rec = serde_json::from_str::<Json>(&line).map_err(|e| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("{}:{}: malformed record: {e}", self.path.display(), n + 1),
                )
            })?;
            out.push(rec);
        }
        Ok(out)
    }

    fn save(&self, records: &[Json]) -> std::io::Result<()> {
        let mut buf = String::new();
        for rec in records {
            let line = serde_json::to_string(rec)
                .map_err(|e| std::io::Error::other(format!("serialize record failed: {e}")))?;
            buf.push_str(&line);
            buf.push('\n');
        }
        write_atomically(&self.path, buf.as_bytes())
    }
}
