//! Native C/C++ compiler driver.
//!
//! Compiles translation units to object files and links them into the
//! output artifact.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::builder::compiler::Compiler;
use crate::core::TranslationUnit;
use crate::util::process::ProcessError;

/// Failure to compile one translation unit.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(
        "failed to compile `{}` to `{}`\n  command: {command}",
        root_path.display(),
        object_path.display()
    )]
    Process {
        root_path: PathBuf,
        object_path: PathBuf,
        command: String,
        #[source]
        source: ProcessError,
    },

    #[error(
        "compiling `{}` to `{}` failed with exit status {status}\n  command: {command}\n{stderr}",
        root_path.display(),
        object_path.display()
    )]
    Failed {
        root_path: PathBuf,
        object_path: PathBuf,
        command: String,
        status: i32,
        stderr: String,
    },
}

impl CompileError {
    /// The source file that failed to compile.
    pub fn root_path(&self) -> &Path {
        match self {
            CompileError::Process { root_path, .. } | CompileError::Failed { root_path, .. } => {
                root_path
            }
        }
    }
}

/// Failure to link the output artifact.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error(
        "failed to link `{}` from {objects} object file(s)\n  command: {command}",
        output.display()
    )]
    Process {
        output: PathBuf,
        objects: usize,
        command: String,
        #[source]
        source: ProcessError,
    },

    #[error(
        "linking `{}` from {objects} object file(s) failed with exit status {status}\n  command: {command}\n{stderr}",
        output.display()
    )]
    Failed {
        output: PathBuf,
        objects: usize,
        command: String,
        status: i32,
        stderr: String,
    },
}

/// Native C/C++ builder.
pub struct NativeBuilder<'a> {
    compiler: &'a Compiler,
}

impl<'a> NativeBuilder<'a> {
    /// Create a new native builder.
    pub fn new(compiler: &'a Compiler) -> Self {
        NativeBuilder { compiler }
    }

    /// Compile a single translation unit to its object file.
    pub fn compile(&self, unit: &TranslationUnit) -> Result<(), CompileError> {
        let spec = self.compiler.compile_command(unit);
        let command = spec.display();

        tracing::debug!(
            "Compiling {} -> {}",
            unit.root_path().display(),
            unit.object_path().display()
        );

        let output = spec
            .to_process()
            .exec()
            .map_err(|source| CompileError::Process {
                root_path: unit.root_path().to_path_buf(),
                object_path: unit.object_path().to_path_buf(),
                command: command.clone(),
                source,
            })?;

        if !output.success() {
            return Err(CompileError::Failed {
                root_path: unit.root_path().to_path_buf(),
                object_path: unit.object_path().to_path_buf(),
                command,
                status: output.status,
                stderr: output.stderr_string().trim_end().to_string(),
            });
        }

        Ok(())
    }

    /// Compile every unit in order, stopping at the first failure.
    ///
    /// `on_compiled` runs after each successful compile.
    pub fn compile_all<F>(
        &self,
        units: &[TranslationUnit],
        mut on_compiled: F,
    ) -> Result<(), CompileError>
    where
        F: FnMut(&TranslationUnit),
    {
        for unit in units {
            self.compile(unit)?;
            on_compiled(unit);
        }
        Ok(())
    }

    /// Link every unit's object file into `output`, in unit order.
    pub fn link(&self, units: &[TranslationUnit], output: &Path) -> Result<(), LinkError> {
        let spec = self.compiler.link_command(units, output);
        let command = spec.display();

        tracing::debug!(
            "Linking {} from {} object file(s)",
            output.display(),
            units.len()
        );

        let result = spec
            .to_process()
            .exec()
            .map_err(|source| LinkError::Process {
                output: output.to_path_buf(),
                objects: units.len(),
                command: command.clone(),
                source,
            })?;

        if !result.success() {
            return Err(LinkError::Failed {
                output: output.to_path_buf(),
                objects: units.len(),
                command,
                status: result.status,
                stderr: result.stderr_string().trim_end().to_string(),
            });
        }

        Ok(())
    }
}
