//! Build event types for JSON output.
//!
//! These events are emitted one JSON object per line on stdout when using
//! `--message-format json`.
//!
//! # Event Types
//!
//! - `compiler-artifact`: A translation unit was checked and, if outdated, compiled
//! - `link-artifact`: The output artifact was linked
//! - `build-finished`: Build completed (success or failure)

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

/// How build progress is reported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MessageFormat {
    /// Log lines and a progress bar on stderr
    #[default]
    Human,
    /// One JSON event per line on stdout
    Json,
}

impl FromStr for MessageFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(MessageFormat::Human),
            "json" => Ok(MessageFormat::Json),
            _ => Err(format!(
                "invalid message format '{}', expected 'human' or 'json'",
                s
            )),
        }
    }
}

impl fmt::Display for MessageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MessageFormat::Human => write!(f, "human"),
            MessageFormat::Json => write!(f, "json"),
        }
    }
}

/// A build event emitted during the build process.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason")]
pub enum BuildEvent {
    /// An object file is up to date, either freshly compiled or reused.
    #[serde(rename = "compiler-artifact")]
    CompilerArtifact {
        /// Source file of the translation unit
        source: PathBuf,
        /// Object file produced
        filenames: Vec<PathBuf>,
        /// Whether the existing object was reused without compiling
        fresh: bool,
    },

    /// The output artifact was linked.
    #[serde(rename = "link-artifact")]
    LinkArtifact {
        /// Linked output file
        output: PathBuf,
        /// Number of object files linked
        objects: usize,
    },

    /// Build completed (success or failure).
    #[serde(rename = "build-finished")]
    BuildFinished {
        /// Whether the build succeeded
        success: bool,
        /// Total build duration in milliseconds
        duration_ms: u64,
        /// Number of translation units compiled this run
        #[serde(skip_serializing_if = "Option::is_none")]
        compiled: Option<usize>,
    },
}

impl BuildEvent {
    /// Create a compiler artifact event.
    pub fn artifact(source: impl Into<PathBuf>, object: impl Into<PathBuf>, fresh: bool) -> Self {
        BuildEvent::CompilerArtifact {
            source: source.into(),
            filenames: vec![object.into()],
            fresh,
        }
    }

    /// Create a link artifact event.
    pub fn linked(output: impl Into<PathBuf>, objects: usize) -> Self {
        BuildEvent::LinkArtifact {
            output: output.into(),
            objects,
        }
    }

    /// Create a build finished event.
    pub fn finished(success: bool, duration_ms: u64, compiled: Option<usize>) -> Self {
        BuildEvent::BuildFinished {
            success,
            duration_ms,
            compiled,
        }
    }

    /// Serialize this event to a JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Print this event as one line on stdout.
    pub fn emit(&self) {
        println!("{}", self.to_json());
    }
}
