//! Build executor with progress reporting.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::compiler::Compiler;
use crate::builder::events::{BuildEvent, MessageFormat};
use crate::builder::native::NativeBuilder;
use crate::core::TranslationUnit;
use crate::ops::incbuild_build::BuildError;

/// Compiles the changed units and links the full set.
pub struct BuildExecutor<'a> {
    compiler: &'a Compiler,
    message_format: MessageFormat,
}

impl<'a> BuildExecutor<'a> {
    /// Create a new build executor.
    pub fn new(compiler: &'a Compiler) -> Self {
        BuildExecutor {
            compiler,
            message_format: MessageFormat::Human,
        }
    }

    pub fn message_format(mut self, format: MessageFormat) -> Self {
        self.message_format = format;
        self
    }

    /// Compile `changed`, then link every unit in `units` into `output`.
    ///
    /// Linking always runs, even when nothing was recompiled.
    pub fn execute(
        &self,
        units: &[TranslationUnit],
        changed: &[TranslationUnit],
        output: &Path,
    ) -> Result<(), BuildError> {
        let json = self.message_format == MessageFormat::Json;
        let builder = NativeBuilder::new(self.compiler);

        if json {
            for unit in units.iter().filter(|u| !changed.contains(u)) {
                BuildEvent::artifact(unit.root_path(), unit.object_path(), true).emit();
            }
        }

        if !changed.is_empty() {
            tracing::info!(
                "Compiling {} of {} translation unit(s)",
                changed.len(),
                units.len()
            );

            let pb = if show_progress(self.message_format, changed.len()) {
                let pb = ProgressBar::new(changed.len() as u64);
                if let Ok(style) = ProgressStyle::default_bar()
                    .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                {
                    pb.set_style(style.progress_chars("#>-"));
                }
                Some(pb)
            } else {
                None
            };

            let result = builder.compile_all(changed, |unit| {
                if let Some(ref pb) = pb {
                    pb.inc(1);
                    if let Some(name) = unit.root_path().file_name() {
                        pb.set_message(name.to_string_lossy().into_owned());
                    }
                }
                if json {
                    BuildEvent::artifact(unit.root_path(), unit.object_path(), false).emit();
                }
            });

            if let Some(pb) = pb {
                if result.is_ok() {
                    pb.finish_and_clear();
                } else {
                    pb.abandon();
                }
            }
            result?;
        } else {
            tracing::info!("All {} translation unit(s) are up to date", units.len());
        }

        tracing::info!("Linking {}", output.display());
        builder.link(units, output)?;

        if json {
            BuildEvent::linked(output, units.len()).emit();
        }

        Ok(())
    }
}

/// Whether compiling `changed` units gets a progress bar.
///
/// JSON output and single compiles never do. Neither does verbose mode,
/// where per-unit debug lines would be drawn through the bar.
fn show_progress(format: MessageFormat, changed: usize) -> bool {
    format == MessageFormat::Human && changed > 1 && !tracing::enabled!(tracing::Level::DEBUG)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    fn with_level<T>(level: Level, f: impl FnOnce() -> T) -> T {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_writer(std::io::sink)
            .finish();
        tracing::subscriber::with_default(subscriber, f)
    }

    #[test]
    fn test_progress_for_several_human_compiles() {
        assert!(with_level(Level::INFO, || show_progress(MessageFormat::Human, 3)));
    }

    #[test]
    fn test_no_progress_in_verbose_mode() {
        assert!(!with_level(Level::DEBUG, || show_progress(MessageFormat::Human, 3)));
    }

    #[test]
    fn test_no_progress_for_json_or_single_compile() {
        with_level(Level::INFO, || {
            assert!(!show_progress(MessageFormat::Json, 3));
            assert!(!show_progress(MessageFormat::Human, 1));
        });
    }
}
