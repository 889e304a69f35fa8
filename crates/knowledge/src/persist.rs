//! Crash-safe file writes.

use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use triage_core::{AppError, AppResult};

/// Write `bytes` to `path` through a uniquely named temp file in the same
/// directory, renamed over the target. Readers see either the old or the new
/// content, and concurrent writers never share a temp file.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> AppResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| AppError::Io(e.error))?;

    tracing::debug!("Wrote {} bytes to {:?}", bytes.len(), path);
    Ok(())
}

/// Read a file, mapping "not found" to `None`.
pub fn read_optional(path: &Path) -> AppResult<Option<String>> {
    match fs::read_to_string(path) {
        Ok(contents) => Ok(Some(contents)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(AppError::Io(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_atomic_creates_parents_and_replaces() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("a/b/CURRENT");

        write_atomic(&path, b"1").unwrap();
        write_atomic(&path, b"2").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "2");
        let leftovers = fs::read_dir(path.parent().unwrap()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_concurrent_writers_do_not_collide() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("metadata.json");

        std::thread::scope(|scope| {
            for i in 0..8 {
                let path = &path;
                scope.spawn(move || write_atomic(path, format!("writer {}", i).as_bytes()).unwrap());
            }
        });

        assert!(fs::read_to_string(&path).unwrap().starts_with("writer "));
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_read_optional_missing() {
        let temp = TempDir::new().unwrap();
        assert!(read_optional(&temp.path().join("nope")).unwrap().is_none());
    }
}
