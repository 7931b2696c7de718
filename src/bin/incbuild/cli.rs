//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// incbuild - Incremental build driver for C and C++ sources
#[derive(Parser)]
#[command(name = "incbuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile outdated sources and link the output
    Build(BuildArgs),

    /// Remove object files and the linked output
    Clean(CleanArgs),
}

/// Locations shared by every command.
#[derive(Args)]
pub struct PathArgs {
    /// Directory containing the source files [default: src]
    #[arg(long, value_name = "DIR")]
    pub source: Option<PathBuf>,

    /// Directory receiving object files [default: obj]
    #[arg(long, value_name = "DIR")]
    pub objects: Option<PathBuf>,

    /// Linked output file [default: a.out]
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub paths: PathArgs,

    /// Compiler driver to invoke
    #[arg(long, value_name = "PATH")]
    pub compiler: Option<PathBuf>,

    /// Print the build plan as JSON (no build)
    #[arg(long)]
    pub plan: bool,

    /// Output format: human, json
    #[arg(long, default_value = "human")]
    pub message_format: String,

    /// Arguments passed to every compiler invocation
    #[arg(last = true, value_name = "COMPILER_ARGS")]
    pub compiler_args: Vec<String>,
}

#[derive(Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub paths: PathArgs,
}
