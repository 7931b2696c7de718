//! Implementation of `incbuild clean`.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::core::registry::{discover, DiscoveryError};
use crate::util::fs::remove_file_if_exists;

#[derive(Debug, Error)]
pub enum CleanError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("failed to remove `{}`", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Options for the clean command.
#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub source_dir: PathBuf,
    pub object_dir: PathBuf,
    pub output: PathBuf,
}

/// Remove the object file of every unit in the source directory, and the
/// linked output.
///
/// Only files a build would have written are removed; other files in the
/// object directory are left alone. A missing source directory removes just
/// the output. Returns the removed paths.
pub fn clean(opts: &CleanOptions) -> Result<Vec<PathBuf>, CleanError> {
    let mut targets = Vec::new();

    if opts.source_dir.is_dir() {
        let units = discover(&opts.source_dir, &opts.object_dir)?;
        targets.extend(units.iter().map(|u| u.object_path().to_path_buf()));
    } else {
        tracing::debug!(
            "source directory {} not found, only removing the output",
            opts.source_dir.display()
        );
    }
    targets.push(opts.output.clone());

    let mut removed = Vec::new();
    for path in targets {
        if remove(&path)? {
            tracing::debug!("removed {}", path.display());
            removed.push(path);
        }
    }

    Ok(removed)
}

fn remove(path: &Path) -> Result<bool, CleanError> {
    remove_file_if_exists(path).map_err(|source| CleanError::Remove {
        path: path.to_path_buf(),
        source,
    })
}
