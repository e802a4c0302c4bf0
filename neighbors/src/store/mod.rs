use std::fs::File;
use std::fs::OpenOptions;
use std::fs::Permissions;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use serde_json::Value as Json;

pub mod json;
pub mod jsonl;

pub use json::JsonArrayStore;
pub use jsonl::JsonlDatasetStore;

const MAX_RETRIES: usize = 10;
const RETRY_MS: u64 = 100;

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

/// Load and persist the dataset's records in index order.
pub trait DatasetStore: Send + Sync {
    fn load(&self) -> std::io::Result<Vec<Json>>;

    /// Replace the whole dataset with `records`.
    fn save(&self, records: &[Json]) -> std::io::Result<()>;
}

/// Pick a store by file extension: `.jsonl` is line-delimited, anything else
/// a single JSON array.
pub fn open_store(path: &Path) -> Box<dyn DatasetStore> {
    match path.extension().and_then(|s| s.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("jsonl") => Box::new(JsonlDatasetStore::new(path)),
        _ => Box::new(JsonArrayStore::new(path)),
    }
}

/// Write `contents` to a sibling temp file under an exclusive lock, then
/// rename it over `path`.
///
/// A symlinked `path` is resolved first so the link survives, and an existing
/// target keeps its permissions; only new files are created owner-only. The
/// temp file is removed if any step fails.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let target = match std::fs::canonicalize(path) {
        Ok(resolved) => resolved,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(e),
    };
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let existing = match std::fs::metadata(&target) {
        Ok(meta) => Some(meta.permissions()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => return Err(e),
    };
    let mut tmp_name = target.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    let mut opts = OpenOptions::new();
    opts.create(true).write(true).truncate(true).read(true);
    #[cfg(unix)]
    { opts.mode(0o600); }
    let out = opts.open(&tmp_path)?;

    let result = fill_and_replace(out, existing, contents, &tmp_path, &target);
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

fn fill_and_replace(
    mut out: File,
    existing: Option<Permissions>,
    contents: &[u8],
    tmp_path: &Path,
    target: &Path,
) -> std::io::Result<()> {
    match existing {
        Some(perms) => out.set_permissions(perms)?,
        None => ensure_owner_only_permissions(&out)?,
    }
    lock_exclusive_with_retry(&out)?;
    out.write_all(contents)?;
    out.flush()?;
    drop(out);
    std::fs::rename(tmp_path, target)
}

/// Open `path` for reading under a shared lock.
pub(crate) fn open_shared(path: &Path) -> std::io::Result<File> {
    let file = OpenOptions::new().read(true).open(path)?;
    lock_shared_with_retry(&file)?;
    Ok(file)
}

#[cfg(unix)]
fn ensure_owner_only_permissions(file: &File) -> std::io::Result<()> {
    let meta = file.metadata()?;
    let mode = meta.permissions().mode() & 0o777;
    if mode != 0o600 {
        let mut p = meta.permissions();
        p.set_mode(0o600);
        file.set_permissions(p)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_owner_only_permissions(_file: &File) -> std::io::Result<()> { Ok(()) }

fn lock_exclusive_with_retry(file: &File) -> std::io::Result<()> {
    for _ in 0..MAX_RETRIES {
        match fs2::FileExt::try_lock_exclusive(file) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(std::time::Duration::from_millis(RETRY_MS));
            }
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(std::io::ErrorKind::WouldBlock, "dataset store: lock timeout"))
}

fn lock_shared_with_retry(file: &File) -> std::io::Result<()> {
    for _ in 0..MAX_RETRIES {
        match fs2::FileExt::try_lock_shared(file) {
            Ok(_) => return Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                std::thread::sleep(std::time::Duration::from_millis(RETRY_MS));
            }
            Err(e) => return Err(e),
        }
    }
    Err(std::io::Error::new(std::io::ErrorKind::WouldBlock, "dataset store: lock timeout"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    #[test]
    fn extension_selects_store_format() {
        let tmp = TempDir::new().unwrap();
        let records = vec![json!({"glossStr": "woman"}), json!({"glossStr": "man"})];

        let lines = tmp.path().join("table.jsonl");
        open_store(&lines).save(&records).unwrap();
        assert_eq!(std::fs::read_to_string(&lines).unwrap().lines().count(), 2);

        let array = tmp.path().join("table.json");
        open_store(&array).save(&records).unwrap();
        assert!(std::fs::read_to_string(&array).unwrap().starts_with('['));
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("out.json");
        write_atomically(&path, b"[]").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
        assert!(!tmp.path().join("nested").join("out.json.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn save_keeps_existing_permissions() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("table.json");
        std::fs::write(&path, "[]").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        JsonArrayStore::new(&path).save(&[json!({"glossStr": "woman"})]).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn new_file_is_owner_only() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("scores.json");
        write_atomically(&path, b"{}").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
    }

    #[cfg(unix)]
    #[test]
    fn save_through_symlink_keeps_the_link() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("real.json");
        let link = tmp.path().join("table.json");
        std::fs::write(&real, "[]").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        JsonArrayStore::new(&link).save(&[json!({"glossStr": "woman"})]).unwrap();
        assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert!(std::fs::read_to_string(&real).unwrap().contains("woman"));
    }

    #[cfg(unix)]
    #[test]
    fn failed_rename_removes_temp_file() {
        let tmp = TempDir::new().unwrap();
        // A non-empty directory cannot be replaced by a file.
        let path = tmp.path().join("occupied");
        std::fs::create_dir(&path).unwrap();
        std::fs::write(path.join("keep"), "x").unwrap();

        assert!(write_atomically(&path, b"[]").is_err());
        assert!(!tmp.path().join("occupied.tmp").exists());
        assert!(path.join("keep").exists());
    }
}
