//! Discovery of translation units in a source directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::builder::depinfo::DependencySource;
use crate::builder::staleness::{is_outdated, EvaluationError};
use crate::core::unit::{is_source_file, TranslationUnit};

/// Failure to list the source directory.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("failed to list source directory `{}`", dir.display())]
    ReadDir {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read an entry of source directory `{}`", dir.display())]
    Entry {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Find every compilable source file directly inside `source_dir`.
///
/// The caller is expected to have checked that `source_dir` is an existing
/// directory; errors here only cover the directory changing while it is
/// being listed. Subdirectories are not searched. Symbolic links are
/// followed, so a link to a source file is a unit and a link to a directory
/// is skipped. Units are sorted by path, which fixes the link order.
pub fn discover(
    source_dir: &Path,
    object_dir: &Path,
) -> Result<Vec<TranslationUnit>, DiscoveryError> {
    let entries = fs::read_dir(source_dir).map_err(|source| DiscoveryError::ReadDir {
        dir: source_dir.to_path_buf(),
        source,
    })?;

    let mut units = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| DiscoveryError::Entry {
            dir: source_dir.to_path_buf(),
            source,
        })?;
        let path = entry.path();

        if path.is_dir() || !is_source_file(&path) {
            continue;
        }

        units.push(TranslationUnit::new(path, object_dir));
    }

    units.sort_by(|a, b| a.root_path().cmp(b.root_path()));

    tracing::debug!(
        "found {} translation unit(s) in {}",
        units.len(),
        source_dir.display()
    );
    Ok(units)
}

/// Select the units whose object files are outdated, in their original
/// order. Stops at the first unit that cannot be evaluated.
pub fn find_changed<D>(
    units: &[TranslationUnit],
    deps: &D,
) -> Result<Vec<TranslationUnit>, EvaluationError>
where
    D: DependencySource + ?Sized,
{
    let mut changed = Vec::new();
    for unit in units {
        if is_outdated(unit, deps)? {
            changed.push(unit.clone());
        }
    }
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::staleness::tests::{touch, FakeDependencies};
    use tempfile::TempDir;

    fn names(units: &[TranslationUnit]) -> Vec<String> {
        units
            .iter()
            .map(|u| u.root_path().file_name().unwrap().to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_discover_filters_extensions() {
        let tmp = TempDir::new().unwrap();
        for name in ["a.cpp", "b.txt", "c.h", "readme.md"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }

        let units = discover(tmp.path(), Path::new("obj")).unwrap();
        assert_eq!(names(&units), vec!["a.cpp"]);
        assert_eq!(units[0].object_path(), Path::new("obj/a.cpp.o"));
    }

    #[test]
    fn test_discover_is_not_recursive_and_sorted() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested").join("deep.c"), "").unwrap();
        // A directory whose name looks like a source file
        fs::create_dir(tmp.path().join("dir.c")).unwrap();
        for name in ["zeta.c", "alpha.cc", "mid.c++", "Upper.C"] {
            fs::write(tmp.path().join(name), "").unwrap();
        }

        let units = discover(tmp.path(), Path::new("obj")).unwrap();
        assert_eq!(names(&units), vec!["Upper.C", "alpha.cc", "mid.c++", "zeta.c"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_discover_follows_symlinks_to_files() {
        let tmp = TempDir::new().unwrap();
        let real = tmp.path().join("real");
        let src = tmp.path().join("src");
        fs::create_dir_all(&real).unwrap();
        fs::create_dir_all(&src).unwrap();
        fs::write(real.join("impl.cpp"), "").unwrap();
        std::os::unix::fs::symlink(real.join("impl.cpp"), src.join("link.cpp")).unwrap();
        std::os::unix::fs::symlink(&real, src.join("linked_dir.c")).unwrap();

        let units = discover(&src, Path::new("obj")).unwrap();
        assert_eq!(names(&units), vec!["link.cpp"]);
    }

    #[test]
    fn test_discover_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let err = discover(&tmp.path().join("missing"), Path::new("obj")).unwrap_err();
        assert!(matches!(err, DiscoveryError::ReadDir { .. }));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_find_changed_preserves_order() {
        let tmp = TempDir::new().unwrap();
        let obj = tmp.path().join("obj");
        fs::create_dir(&obj).unwrap();
        let units: Vec<_> = ["a.c", "b.c", "c.c"]
            .iter()
            .map(|n| TranslationUnit::new(tmp.path().join(n), &obj))
            .collect();
        for unit in &units {
            touch(unit.root_path(), 0);
            touch(unit.object_path(), 10);
        }
        // a and c have newer sources
        touch(units[0].root_path(), 20);
        touch(units[2].root_path(), 20);

        let changed = find_changed(&units, &FakeDependencies::default()).unwrap();
        assert_eq!(changed, vec![units[0].clone(), units[2].clone()]);
    }

    #[test]
    fn test_find_changed_stops_at_first_error() {
        let tmp = TempDir::new().unwrap();
        let obj = tmp.path().join("obj");
        fs::create_dir(&obj).unwrap();
        let units: Vec<_> = ["one.c", "two.c", "three.c"]
            .iter()
            .map(|n| TranslationUnit::new(tmp.path().join(n), &obj))
            .collect();
        for unit in &units {
            touch(unit.root_path(), 0);
            touch(unit.object_path(), 10);
        }

        let deps = FakeDependencies {
            failing: vec![units[1].root_path().to_path_buf()],
            ..Default::default()
        };

        let err = find_changed(&units, &deps).unwrap_err();
        assert!(matches!(err, EvaluationError::Dependencies { .. }));
        assert_eq!(
            *deps.queried.borrow(),
            vec![
                units[0].root_path().to_path_buf(),
                units[1].root_path().to_path_buf()
            ]
        );
    }

    #[test]
    fn test_find_changed_twice_without_changes_is_stable() {
        let tmp = TempDir::new().unwrap();
        let obj = tmp.path().join("obj");
        fs::create_dir(&obj).unwrap();
        for name in ["x.cpp", "y.cpp"] {
            touch(&tmp.path().join(name), 0);
        }

        let units = discover(tmp.path(), &obj).unwrap();
        let deps = FakeDependencies::default();
        let first = find_changed(&units, &deps).unwrap();
        let second = find_changed(&units, &deps).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);

        // Simulate a successful build writing fresh objects
        for unit in &first {
            touch(unit.object_path(), 10);
        }
        assert!(find_changed(&units, &deps).unwrap().is_empty());
    }
}
