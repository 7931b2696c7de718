//! Compiler command construction.
//!
//! A [`Compiler`] is an executable plus the passthrough arguments given on
//! the command line. It never changes during a build; every invocation gets
//! its own [`CommandSpec`].

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

use crate::core::TranslationUnit;
use crate::util::process::{find_cxx_compiler, ProcessBuilder};

/// Compiler used when nothing is configured and none is found on `PATH`.
pub const FALLBACK_COMPILER: &str = "/usr/bin/g++";

/// A command to execute: program and arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    /// The program to run (e.g., "g++")
    pub program: PathBuf,
    /// Command arguments, passed to the process byte for byte
    #[serde(serialize_with = "serialize_lossy")]
    pub args: Vec<OsString>,
}

fn serialize_lossy<S: Serializer>(args: &[OsString], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(args.iter().map(|a| a.to_string_lossy()))
}

impl CommandSpec {
    /// Create a new command spec.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Add an argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    /// Add multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl AsRef<OsStr>>) -> Self {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn to_process(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.program).args(&self.args)
    }

    /// Render the command line for messages.
    pub fn display(&self) -> String {
        self.to_process().display_command()
    }
}

/// The external compiler driver and its passthrough arguments.
#[derive(Debug, Clone)]
pub struct Compiler {
    program: PathBuf,
    args: Vec<String>,
}

impl Compiler {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Compiler {
            program: program.into(),
            args,
        }
    }

    /// Use `CXX` or the first C++ driver on `PATH`, falling back to
    /// [`FALLBACK_COMPILER`].
    pub fn detect(args: Vec<String>) -> Self {
        let program = find_cxx_compiler().unwrap_or_else(|| PathBuf::from(FALLBACK_COMPILER));
        tracing::debug!("using compiler {}", program.display());
        Compiler::new(program, args)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Passthrough arguments added to every invocation.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn base_command(&self) -> CommandSpec {
        CommandSpec::new(&self.program).args(&self.args)
    }

    /// `<compiler> <args> -c <source> -o <object>`
    pub fn compile_command(&self, unit: &TranslationUnit) -> CommandSpec {
        self.base_command()
            .arg("-c")
            .arg(unit.root_path())
            .arg("-o")
            .arg(unit.object_path())
    }

    /// `<compiler> <args> -o <output> <object>...`, objects in unit order.
    pub fn link_command(&self, units: &[TranslationUnit], output: &Path) -> CommandSpec {
        self.base_command()
            .arg("-o")
            .arg(output)
            .args(units.iter().map(|u| u.object_path()))
    }

    /// `<compiler> <args> <source> -MM -MT ""`
    ///
    /// Prints a single make rule listing every file the source includes,
    /// with an empty target so the rule starts with the colon.
    pub fn dependency_command(&self, source: &Path) -> CommandSpec {
        self.base_command()
            .arg(source)
            .arg("-MM")
            .arg("-MT")
            .arg("")
    }
}
