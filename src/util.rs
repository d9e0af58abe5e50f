//! Small filesystem helpers shared by the question bank, stores and logs.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::{DrillError, Result};

/// Maximum file size that can be read into memory (10 MB).
///
/// Question banks, learner files and the interaction log should stay well
/// under this limit.
pub const MAX_FILE_SIZE: u64 = 10 * 1024 * 1024; // 10 MB

/// Read a file into a string, refusing files larger than `MAX_FILE_SIZE`.
pub fn read_to_string_limited(path: &Path) -> Result<String> {
    read_to_string_with_limit(path, MAX_FILE_SIZE)
}

/// Read a file into a string with a custom size limit.
///
/// # Errors
///
/// Returns a storage error if the file cannot be read or exceeds `max_size`.
pub fn read_to_string_with_limit(path: &Path, max_size: u64) -> Result<String> {
    let metadata = fs::metadata(path).map_err(|e| DrillError::storage(path, e))?;

    let size = metadata.len();
    if size > max_size {
        return Err(DrillError::storage(
            path,
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("file too large ({} bytes, max {} bytes)", size, max_size),
            ),
        ));
    }

    fs::read_to_string(path).map_err(|e| DrillError::storage(path, e))
}

/// Write `contents` to `path` atomically via a sibling temp file and rename.
///
/// The temp file is named `.<file name>.tmp` so directory listings can skip it.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = path.with_file_name(format!(".{}.tmp", file_name));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| DrillError::storage(parent, e))?;
        }
    }

    {
        let mut file = fs::File::create(&temp_path).map_err(|e| DrillError::storage(&temp_path, e))?;
        file.write_all(contents)
            .map_err(|e| DrillError::storage(&temp_path, e))?;
        file.sync_all()
            .map_err(|e| DrillError::storage(&temp_path, e))?;
    }

    // Rename is atomic on POSIX
    fs::rename(&temp_path, path).map_err(|e| DrillError::storage(path, e))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_to_string_limited_success() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("bank.json");
        fs::write(&path, "[]").unwrap();

        let content = read_to_string_limited(&path).unwrap();
        assert_eq!(content, "[]");
    }

    #[test]
    fn test_read_to_string_limited_nonexistent() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nonexistent.json");

        let err = read_to_string_limited(&path).unwrap_err();
        assert!(matches!(err, DrillError::Storage { .. }));
        assert!(err.to_string().contains("nonexistent.json"));
    }

    #[test]
    fn test_read_to_string_with_limit_exceeds() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("large.txt");
        fs::write(&path, [b'x'; 1000]).unwrap();

        let err = read_to_string_with_limit(&path, 500).unwrap_err().to_string();
        assert!(err.contains("too large"));
        assert!(err.contains("1000 bytes"));
        assert!(err.contains("max 500 bytes"));
    }

    #[test]
    fn test_read_to_string_with_limit_at_boundary() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("boundary.txt");
        fs::write(&path, "x".repeat(100)).unwrap();

        assert!(read_to_string_with_limit(&path, 100).is_ok());
        assert!(read_to_string_with_limit(&path, 99).is_err());
    }

    #[test]
    fn test_atomic_write_creates_parent_and_cleans_temp() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("nested").join("alice.json");

        atomic_write(&path, b"{}").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");
        assert!(!temp.path().join("nested").join(".alice.json.tmp").exists());
    }

    #[test]
    fn test_atomic_write_replaces_existing() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("state.json");

        atomic_write(&path, b"first").unwrap();
        atomic_write(&path, b"second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }
}
