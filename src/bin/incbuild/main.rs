//! incbuild CLI - Incremental build driver for C and C++ sources

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use incbuild::ops::incbuild_build::EXIT_OTHER;
use incbuild::ops::BuildError;

fn main() {
    // Usage errors exit 1 so they never read as a source directory failure
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let code = if e.use_stderr() { EXIT_OTHER } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("error: {:#}", e);
        let code = e
            .downcast_ref::<BuildError>()
            .map(BuildError::exit_code)
            .unwrap_or(EXIT_OTHER);
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {

    // Set up logging; stdout is reserved for JSON output
    let filter = if cli.verbose {
        EnvFilter::new("incbuild=debug")
    } else {
        EnvFilter::new("incbuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Build(args) => commands::build::execute(args),
        Commands::Clean(args) => commands::clean::execute(args),
    }
}
