//! Deciding whether an object file must be rebuilt.
//!
//! An object is outdated when it is missing, or when its source or any
//! header the compiler reports for that source was modified after it.
//! Comparisons are strict: a dependency with exactly the object's
//! modification time does not trigger a rebuild. On filesystems with coarse
//! timestamps an edit landing in the same tick as the previous compile can
//! therefore go unnoticed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use thiserror::Error;

use crate::builder::depinfo::{DependencySource, ExtractionError};
use crate::core::TranslationUnit;

/// Failure to decide whether a translation unit is outdated.
#[derive(Debug, Error)]
pub enum EvaluationError {
    #[error("failed to read modification time of object file `{}`", object_path.display())]
    ObjectMetadata {
        object_path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read modification time of source file `{}`", root_path.display())]
    SourceMetadata {
        root_path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to determine the includes of `{}`", root_path.display())]
    Dependencies {
        root_path: PathBuf,
        #[source]
        source: ExtractionError,
    },

    #[error(
        "failed to read modification time of `{}`, included by `{}`",
        dependency.display(),
        root_path.display()
    )]
    DependencyMetadata {
        dependency: PathBuf,
        root_path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Whether `unit`'s object file is missing or older than its inputs.
pub fn is_outdated<D>(unit: &TranslationUnit, deps: &D) -> Result<bool, EvaluationError>
where
    D: DependencySource + ?Sized,
{
    let object_time = match modified(unit.object_path()) {
        Ok(time) => time,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(
                "{} is outdated: {} does not exist",
                unit.root_path().display(),
                unit.object_path().display()
            );
            return Ok(true);
        }
        Err(source) => {
            return Err(EvaluationError::ObjectMetadata {
                object_path: unit.object_path().to_path_buf(),
                source,
            })
        }
    };

    let source_time =
        modified(unit.root_path()).map_err(|source| EvaluationError::SourceMetadata {
            root_path: unit.root_path().to_path_buf(),
            source,
        })?;
    if source_time > object_time {
        tracing::debug!("{} is outdated: source modified", unit.root_path().display());
        return Ok(true);
    }

    let dependencies =
        deps.dependencies(unit.root_path())
            .map_err(|source| EvaluationError::Dependencies {
                root_path: unit.root_path().to_path_buf(),
                source,
            })?;

    for dependency in &dependencies {
        let time = modified(dependency).map_err(|source| EvaluationError::DependencyMetadata {
            dependency: dependency.clone(),
            root_path: unit.root_path().to_path_buf(),
            source,
        })?;
        if time > object_time {
            tracing::debug!(
                "{} is outdated: {} modified",
                unit.root_path().display(),
                dependency.display()
            );
            return Ok(true);
        }
    }

    Ok(false)
}

fn modified(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path)?.modified()
}
