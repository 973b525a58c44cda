//! Atomic file writes and JSON Lines checkpoints.
//!
//! Every artifact the pipeline leaves on disk goes through `atomic_write`:
//! write a `.tmp` sibling, then rename over the target. A crash mid-write
//! leaves the previous version in place.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io;
use std::path::{Path, PathBuf};

/// Atomically write raw bytes to a file, creating parent directories.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = tmp_sibling(path);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Atomically write `items` as JSON Lines, one compact object per line.
pub fn atomic_write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> io::Result<()> {
    let mut buf = String::new();
    for item in items {
        let line = serde_json::to_string(item).map_err(io::Error::other)?;
        buf.push_str(&line);
        buf.push('\n');
    }
    atomic_write(path, buf.as_bytes())
}

/// Load a JSON Lines file. Returns `Ok(None)` if the file doesn't exist.
pub fn load_jsonl<T: DeserializeOwned>(path: &Path) -> io::Result<Option<Vec<T>>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let mut items = Vec::new();
    for (idx, line) in data.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(line).map_err(|e| {
            io::Error::new(io::ErrorKind::InvalidData, format!("line {}: {e}", idx + 1))
        })?;
        items.push(item);
    }
    Ok(Some(items))
}

/// Remove a file if present.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn tmp_sibling(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Entry {
        decision: String,
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("en").join("age.csv");
        atomic_write(&path, b"a,b\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\n");
        assert!(!dir.path().join("en").join("age.csv.tmp").exists());
    }

    #[test]
    fn test_jsonl_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("age.checkpoint.jsonl");
        let entries = vec![
            Entry {
                decision: "hire".into(),
            },
            Entry {
                decision: "reject".into(),
            },
        ];
        atomic_write_jsonl(&path, &entries).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
        let loaded: Vec<Entry> = load_jsonl(&path).unwrap().unwrap();
        assert_eq!(loaded, entries);
    }

    #[test]
    fn test_load_jsonl_missing_and_invalid() {
        let dir = TempDir::new().unwrap();
        let missing: Option<Vec<Entry>> = load_jsonl(&dir.path().join("nope.jsonl")).unwrap();
        assert!(missing.is_none());

        let bad = dir.path().join("bad.jsonl");
        std::fs::write(&bad, "{\"decision\":\"hire\"}\n{oops\n").unwrap();
        let err = load_jsonl::<Entry>(&bad).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_remove_if_exists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("x.jsonl");
        remove_if_exists(&path).unwrap();
        std::fs::write(&path, "").unwrap();
        remove_if_exists(&path).unwrap();
        assert!(!path.exists());
    }
}
