//! Filesystem utilities.

use std::fs;
use std::io;
use std::path::Path;

/// Ensure a directory exists, creating it and its parents if necessary.
pub fn ensure_dir(path: &Path) -> io::Result<()> {
    if path.as_os_str().is_empty() || path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path)
}

/// Ensure the directory containing `path` exists.
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) => ensure_dir(parent),
        None => Ok(()),
    }
}

/// Remove a file if it exists. Returns whether a file was removed.
pub fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    match fs::remove_file(path) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_ensure_dir_nested() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("a").join("b");

        ensure_dir(&dir).unwrap();
        assert!(dir.is_dir());
        // Second call is a no-op
        ensure_dir(&dir).unwrap();
    }

    #[test]
    fn test_ensure_dir_over_file_fails() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("file");
        fs::write(&file, "").unwrap();

        assert!(ensure_dir(&file).is_err());
    }

    #[test]
    fn test_ensure_parent_dir() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("bin").join("app");

        ensure_parent_dir(&out).unwrap();
        assert!(tmp.path().join("bin").is_dir());
        assert!(!out.exists());

        // Bare file names have an empty parent
        ensure_parent_dir(Path::new("a.out")).unwrap();
    }

    #[test]
    fn test_remove_file_if_exists() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("x.o");
        fs::write(&file, "").unwrap();

        assert!(remove_file_if_exists(&file).unwrap());
        assert!(!file.exists());
        assert!(!remove_file_if_exists(&file).unwrap());
    }
}
