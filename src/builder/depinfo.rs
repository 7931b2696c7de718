//! Header dependency discovery.
//!
//! The compiler is asked for a make rule (`-MM -MT ""`) naming every file a
//! source transitively includes. The rule is escaped the way make expects:
//! `\ ` is a space inside a file name and a backslash before a newline
//! continues the rule on the next line.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::builder::compiler::Compiler;
use crate::util::process::ProcessError;

/// Failure to obtain the dependency list of a source file.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to list dependencies of `{}`", source_file.display())]
    Process {
        source_file: PathBuf,
        #[source]
        source: ProcessError,
    },

    #[error(
        "listing dependencies of `{}` failed with exit status {status}\n  command: {command}\n{stderr}",
        source_file.display()
    )]
    Status {
        source_file: PathBuf,
        command: String,
        status: i32,
        stderr: String,
    },
}

/// Something that can report the files a source file includes.
pub trait DependencySource {
    /// Every file `source` transitively includes, in the order reported.
    fn dependencies(&self, source: &Path) -> Result<Vec<PathBuf>, ExtractionError>;
}

impl DependencySource for Compiler {
    fn dependencies(&self, source: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let spec = self.dependency_command(source);
        let output = spec
            .to_process()
            .exec()
            .map_err(|e| ExtractionError::Process {
                source_file: source.to_path_buf(),
                source: e,
            })?;

        if !output.success() {
            return Err(ExtractionError::Status {
                source_file: source.to_path_buf(),
                command: spec.display(),
                status: output.status,
                stderr: output.stderr_string().trim_end().to_string(),
            });
        }

        let prerequisites = split_prerequisites(&output.stdout);
        tracing::debug!(
            "{} depends on {} file(s)",
            source.display(),
            prerequisites.len()
        );
        Ok(prerequisites.into_iter().map(path_from_bytes).collect())
    }
}

/// Parse the prerequisites of a make rule whose target was left empty.
///
/// The first character (the rule's colon) is skipped. A backslash keeps a
/// following backslash or space literally and swallows anything else, so
/// escaped newlines vanish. Runs of spaces separate names and an unescaped
/// newline ends the rule.
pub fn parse_make_prerequisites(rule: &str) -> Vec<String> {
    split_prerequisites(rule.as_bytes())
        .into_iter()
        .map(|name| String::from_utf8_lossy(&name).into_owned())
        .collect()
}

/// Byte-level parser behind [`parse_make_prerequisites`]. File names are
/// kept as raw bytes so names that are not UTF-8 survive.
fn split_prerequisites(rule: &[u8]) -> Vec<Vec<u8>> {
    const DELIMITER: u8 = b' ';
    const ESCAPE: u8 = b'\\';

    let mut prerequisites = Vec::new();
    let mut prerequisite = Vec::new();
    let mut escaping = false;

    for &c in rule.iter().skip(1) {
        if escaping {
            escaping = false;
            if c == ESCAPE || c == DELIMITER {
                prerequisite.push(c);
            }
            continue;
        }

        match c {
            ESCAPE => escaping = true,
            b'\n' => break,
            DELIMITER => {
                if !prerequisite.is_empty() {
                    prerequisites.push(std::mem::take(&mut prerequisite));
                }
            }
            _ => prerequisite.push(c),
        }
    }

    if !prerequisite.is_empty() {
        prerequisites.push(prerequisite);
    }

    prerequisites
}

#[cfg(unix)]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    use std::ffi::OsString;
    use std::os::unix::ffi::OsStringExt;

    PathBuf::from(OsString::from_vec(bytes))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: Vec<u8>) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(&bytes).into_owned())
}
