//! Build system implementation.
//!
//! Compiler invocation, include extraction, staleness checks and the
//! executor that ties them together.

pub mod compiler;
pub mod depinfo;
pub mod events;
pub mod executor;
pub mod native;
pub mod staleness;

pub use compiler::{CommandSpec, Compiler};
pub use depinfo::{DependencySource, ExtractionError};
pub use events::{BuildEvent, MessageFormat};
pub use executor::BuildExecutor;
pub use native::{CompileError, LinkError, NativeBuilder};
pub use staleness::{is_outdated, EvaluationError};
