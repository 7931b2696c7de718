//! `incbuild build` command

use std::time::Instant;

use anyhow::Result;

use crate::cli::BuildArgs;
use crate::commands::{config, resolve_paths};
use incbuild::builder::{Compiler, MessageFormat};
use incbuild::ops::incbuild_build::{build, plan, BuildOptions};

pub fn execute(args: BuildArgs) -> Result<()> {
    let start = Instant::now();
    let config = config();

    let message_format: MessageFormat = args
        .message_format
        .parse()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    // Passthrough arguments: CLI > config
    let compiler_args = if args.compiler_args.is_empty() {
        config.build.args.clone()
    } else {
        args.compiler_args
    };

    // Compiler: CLI > config > detected
    let compiler = match args.compiler.or_else(|| config.build.compiler.clone()) {
        Some(program) => Compiler::new(program, compiler_args),
        None => Compiler::detect(compiler_args),
    };

    let (source_dir, object_dir, output) = resolve_paths(args.paths, &config);
    let opts = BuildOptions {
        source_dir,
        object_dir,
        output,
        message_format,
    };

    if args.plan {
        let plan = plan(&compiler, &opts)?;
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let result = build(&compiler, &opts)?;

    if message_format == MessageFormat::Human {
        if let Some(output) = &result.output {
            eprintln!(
                "    Finished {} ({} of {} compiled) in {:.2}s",
                output.display(),
                result.compiled.len(),
                result.units.len(),
                start.elapsed().as_secs_f64()
            );
        }
    }

    Ok(())
}
