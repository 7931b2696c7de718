//! incbuild - Incremental build driver for C and C++ sources
//!
//! This crate provides the library behind the `incbuild` binary: discovery
//! of translation units, header-aware staleness checks, and compilation and
//! linking through an external compiler driver.

pub mod builder;
pub mod core;
pub mod ops;
pub mod util;

pub use builder::Compiler;
pub use core::TranslationUnit;
pub use ops::BuildError;
