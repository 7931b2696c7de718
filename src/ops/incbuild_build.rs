//! Implementation of `incbuild build`.
//!
//! A build discovers the translation units in the source directory,
//! recompiles the ones whose object files are outdated and links every
//! object file into the output.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;

use crate::builder::compiler::{CommandSpec, Compiler};
use crate::builder::events::{BuildEvent, MessageFormat};
use crate::builder::executor::BuildExecutor;
use crate::builder::native::{CompileError, LinkError};
use crate::builder::staleness::EvaluationError;
use crate::core::registry::{discover, find_changed, DiscoveryError};
use crate::core::TranslationUnit;
use crate::util::fs::{ensure_dir, ensure_parent_dir};

/// Exit code for failures without a more specific code.
pub const EXIT_OTHER: i32 = 1;
/// Exit code when the source directory cannot be listed.
pub const EXIT_DISCOVERY: i32 = 2;
/// Exit code when a unit's staleness cannot be decided.
pub const EXIT_EVALUATION: i32 = 3;
/// Exit code when a translation unit fails to compile.
pub const EXIT_COMPILE: i32 = 4;
/// Exit code when linking fails.
pub const EXIT_LINK: i32 = 5;

/// Failure of a build, identifying the stage that failed.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("source directory `{}` does not exist or is not a directory", dir.display())]
    SourceDirectory { dir: PathBuf },

    #[error("failed to create directory `{}`", dir.display())]
    CreateDirectory {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Evaluation(#[from] EvaluationError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Link(#[from] LinkError),
}

impl BuildError {
    /// Process exit code for this failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::SourceDirectory { .. } | BuildError::Discovery(_) => EXIT_DISCOVERY,
            BuildError::Evaluation(_) => EXIT_EVALUATION,
            BuildError::Compile(_) => EXIT_COMPILE,
            BuildError::Link(_) => EXIT_LINK,
            BuildError::CreateDirectory { .. } => EXIT_OTHER,
        }
    }
}

/// Options for the build command.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Directory scanned for source files (not recursive)
    pub source_dir: PathBuf,

    /// Directory receiving object files
    pub object_dir: PathBuf,

    /// Linked output file
    pub output: PathBuf,

    /// How progress is reported
    pub message_format: MessageFormat,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            source_dir: PathBuf::from("src"),
            object_dir: PathBuf::from("obj"),
            output: PathBuf::from("a.out"),
            message_format: MessageFormat::Human,
        }
    }
}

/// What a successful build did.
#[derive(Debug, Clone)]
pub struct BuildResult {
    /// Every unit found in the source directory, in link order
    pub units: Vec<TranslationUnit>,

    /// Units recompiled by this build
    pub compiled: Vec<TranslationUnit>,

    /// The linked output, `None` when there was nothing to link
    pub output: Option<PathBuf>,
}

/// The commands a build would run, without running them.
#[derive(Debug, Clone, Serialize)]
pub struct BuildPlan {
    pub units: Vec<PlannedUnit>,

    /// `None` when there is nothing to link
    pub link: Option<CommandSpec>,
}

/// One translation unit in a [`BuildPlan`].
#[derive(Debug, Clone, Serialize)]
pub struct PlannedUnit {
    pub source: PathBuf,
    pub object: PathBuf,

    /// Present when the unit is outdated
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile: Option<CommandSpec>,
}

impl BuildPlan {
    /// Number of units the plan would recompile.
    pub fn outdated(&self) -> usize {
        self.units.iter().filter(|u| u.compile.is_some()).count()
    }
}

/// Check that the source directory exists before listing it.
fn check_source_dir(dir: &Path) -> Result<(), BuildError> {
    if !dir.is_dir() {
        return Err(BuildError::SourceDirectory {
            dir: dir.to_path_buf(),
        });
    }
    Ok(())
}

/// Discover the units and select the outdated ones.
fn changed_units(
    compiler: &Compiler,
    opts: &BuildOptions,
) -> Result<(Vec<TranslationUnit>, Vec<TranslationUnit>), BuildError> {
    check_source_dir(&opts.source_dir)?;

    let units = discover(&opts.source_dir, &opts.object_dir)?;
    let changed = find_changed(&units, compiler)?;

    tracing::debug!(
        "{} of {} translation unit(s) outdated",
        changed.len(),
        units.len()
    );
    Ok((units, changed))
}

/// Run an incremental build.
pub fn build(compiler: &Compiler, opts: &BuildOptions) -> Result<BuildResult, BuildError> {
    let start = Instant::now();
    let result = run_build(compiler, opts);

    if opts.message_format == MessageFormat::Json {
        BuildEvent::finished(
            result.is_ok(),
            start.elapsed().as_millis() as u64,
            result.as_ref().ok().map(|r| r.compiled.len()),
        )
        .emit();
    }

    result
}

fn run_build(compiler: &Compiler, opts: &BuildOptions) -> Result<BuildResult, BuildError> {
    let (units, changed) = changed_units(compiler, opts)?;

    if units.is_empty() {
        tracing::warn!(
            "no source files found in {}, nothing to link",
            opts.source_dir.display()
        );
        return Ok(BuildResult {
            units,
            compiled: changed,
            output: None,
        });
    }

    ensure_dir(&opts.object_dir).map_err(|source| BuildError::CreateDirectory {
        dir: opts.object_dir.clone(),
        source,
    })?;
    ensure_parent_dir(&opts.output).map_err(|source| BuildError::CreateDirectory {
        dir: opts.output.parent().unwrap_or(Path::new("")).to_path_buf(),
        source,
    })?;

    BuildExecutor::new(compiler)
        .message_format(opts.message_format)
        .execute(&units, &changed, &opts.output)?;

    Ok(BuildResult {
        units,
        compiled: changed,
        output: Some(opts.output.clone()),
    })
}

/// Compute the commands a build would run.
///
/// Staleness is evaluated exactly as for a build, so the compiler is still
/// invoked to list each unit's includes.
pub fn plan(compiler: &Compiler, opts: &BuildOptions) -> Result<BuildPlan, BuildError> {
    let (units, changed) = changed_units(compiler, opts)?;

    let planned = units
        .iter()
        .map(|unit| PlannedUnit {
            source: unit.root_path().to_path_buf(),
            object: unit.object_path().to_path_buf(),
            compile: changed
                .contains(unit)
                .then(|| compiler.compile_command(unit)),
        })
        .collect();

    let link = (!units.is_empty()).then(|| compiler.link_command(&units, &opts.output));

    Ok(BuildPlan {
        units: planned,
        link,
    })
}
