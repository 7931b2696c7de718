//! Core data structures.

pub mod registry;
pub mod unit;

pub use registry::{discover, find_changed, DiscoveryError};
pub use unit::TranslationUnit;
