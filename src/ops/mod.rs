//! High-level operations.
//!
//! This module contains the implementation of incbuild commands.

pub mod incbuild_build;
pub mod incbuild_clean;

pub use incbuild_build::{build, plan, BuildError, BuildOptions, BuildPlan, BuildResult};
pub use incbuild_clean::{clean, CleanError, CleanOptions};
