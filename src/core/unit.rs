//! Translation units.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// File name suffixes compiled as C or C++.
///
/// Case-sensitive: `.C` is C++, `.CPP` is not recognized.
pub const SOURCE_EXTENSIONS: &[&str] = &["c", "cc", "cp", "cxx", "cpp", "c++", "C"];

/// A source file and the object file it compiles to.
///
/// The object path is derived once from the source file name and the object
/// directory and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranslationUnit {
    root_path: PathBuf,
    object_path: PathBuf,
}

impl TranslationUnit {
    pub fn new(root_path: impl Into<PathBuf>, object_dir: &Path) -> Self {
        let root_path = root_path.into();
        let object_path = Self::source_to_object(&root_path, object_dir);
        TranslationUnit {
            root_path,
            object_path,
        }
    }

    /// `object_dir/<source file name>.o`
    pub fn source_to_object(root_path: &Path, object_dir: &Path) -> PathBuf {
        let mut name = root_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(OsString::new);
        name.push(".o");
        object_dir.join(name)
    }

    /// The source file this unit is compiled from.
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    /// Where compilation writes the object file.
    pub fn object_path(&self) -> &Path {
        &self.object_path
    }
}

/// Whether `path` has one of the [`SOURCE_EXTENSIONS`].
pub fn is_source_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_path_keeps_source_extension() {
        let unit = TranslationUnit::new("src/main.cpp", Path::new("obj"));
        assert_eq!(unit.root_path(), Path::new("src/main.cpp"));
        assert_eq!(unit.object_path(), Path::new("obj/main.cpp.o"));
    }

    #[test]
    fn test_same_name_in_different_extensions_does_not_collide() {
        let c = TranslationUnit::new("src/util.c", Path::new("obj"));
        let cpp = TranslationUnit::new("src/util.cpp", Path::new("obj"));
        assert_ne!(c.object_path(), cpp.object_path());
    }

    #[test]
    fn test_object_path_ignores_source_directory() {
        let a = TranslationUnit::source_to_object(Path::new("/abs/src/x.cc"), Path::new("out"));
        let b = TranslationUnit::source_to_object(Path::new("x.cc"), Path::new("out"));
        assert_eq!(a, b);
        assert_eq!(a, PathBuf::from("out/x.cc.o"));
    }

    #[test]
    fn test_is_source_file() {
        for name in ["a.c", "a.cc", "a.cp", "a.cxx", "a.cpp", "a.c++", "a.C"] {
            assert!(is_source_file(Path::new(name)), "{name}");
        }
        for name in ["a.h", "a.hpp", "a.txt", "readme.md", "a.CPP", "a.Cc", "Makefile", ".c"] {
            assert!(!is_source_file(Path::new(name)), "{name}");
        }
    }
}
