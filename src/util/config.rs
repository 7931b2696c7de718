//! Configuration file support for incbuild.
//!
//! incbuild reads two configuration files:
//! - Global: `~/.incbuild/config.toml` - User-wide defaults
//! - Project: `incbuild.toml` in the working directory
//!
//! Project config takes precedence over global config, and command-line
//! options take precedence over both.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Name of the project configuration file.
pub const PROJECT_CONFIG_FILE: &str = "incbuild.toml";

/// incbuild configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Compiler driver (e.g., /usr/bin/clang++)
    pub compiler: Option<PathBuf>,

    /// Arguments passed to every compiler invocation
    pub args: Vec<String>,

    /// Directory scanned for source files
    pub source_dir: Option<PathBuf>,

    /// Directory receiving object files
    pub object_dir: Option<PathBuf>,

    /// Linked output file
    pub output: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file is missing
    /// or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.compiler.is_some() {
            self.build.compiler = other.build.compiler;
        }
        if !other.build.args.is_empty() {
            self.build.args = other.build.args;
        }
        if other.build.source_dir.is_some() {
            self.build.source_dir = other.build.source_dir;
        }
        if other.build.object_dir.is_some() {
            self.build.object_dir = other.build.object_dir;
        }
        if other.build.output.is_some() {
            self.build.output = other.build.output;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (incbuild.toml)
/// 2. Global config (~/.incbuild/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    config.merge(Config::load_or_default(project_path));

    config
}

/// Get the global incbuild config directory (~/.incbuild).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".incbuild"))
}

/// Get the global config path (~/.incbuild/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (incbuild.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_CONFIG_FILE)
}
