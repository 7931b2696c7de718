//! `incbuild clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use crate::commands::{config, resolve_paths};
use incbuild::ops::incbuild_clean::{clean, CleanOptions};

pub fn execute(args: CleanArgs) -> Result<()> {
    let config = config();
    let (source_dir, object_dir, output) = resolve_paths(args.paths, &config);

    let removed = clean(&CleanOptions {
        source_dir,
        object_dir,
        output,
    })?;

    for path in &removed {
        eprintln!("     Removed {}", path.display());
    }
    if removed.is_empty() {
        eprintln!("     Nothing to clean");
    }

    Ok(())
}
