//! Command implementations

pub mod build;
pub mod clean;

use std::env;
use std::path::PathBuf;

use incbuild::util::config::{global_config_path, load_config, project_config_path};
use incbuild::util::Config;

use crate::cli::PathArgs;

/// Load global and project configuration for the current directory.
pub fn config() -> Config {
    let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    load_config(global_config_path().as_deref(), &project_config_path(&cwd))
}

/// Source directory, object directory and output: CLI > config > default.
pub fn resolve_paths(args: PathArgs, config: &Config) -> (PathBuf, PathBuf, PathBuf) {
    let source_dir = args
        .source
        .or_else(|| config.build.source_dir.clone())
        .unwrap_or_else(|| PathBuf::from("src"));
    let object_dir = args
        .objects
        .or_else(|| config.build.object_dir.clone())
        .unwrap_or_else(|| PathBuf::from("obj"));
    let output = args
        .output
        .or_else(|| config.build.output.clone())
        .unwrap_or_else(|| PathBuf::from("a.out"));
    (source_dir, object_dir, output)
}
