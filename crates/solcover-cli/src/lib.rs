//! Solcover CLI library
//!
//! Argument parsing and the glue that turns parsed arguments into one
//! coverage run.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

mod commands;
mod error;

pub use commands::{Cli, ColorArg};
pub use error::{CliError, CliResult};

use solcover::{
    shutdown_signal, ColorChoice, CoverageConfig, CoverageRunner, ProjectConfig, RunOptions,
    RunSummary, Toolchain, Ui,
};

/// Load both configuration files and run coverage once
///
/// Interrupt handlers are installed before anything else so an early ctrl-c
/// still goes through cleanup.
pub async fn run(cli: &Cli) -> CliResult<RunSummary> {
    if cli.skip.iter().any(|entry| entry.trim().is_empty()) {
        return Err(CliError::invalid_argument("empty --skip entry"));
    }

    let interrupt = shutdown_signal()?;

    let project = ProjectConfig::load(&cli.config)?;
    let mut coverage =
        CoverageConfig::load_or_default(&cli.solcover)?.with_extra_skips(cli.skip.iter().cloned());
    coverage.passthrough |= cli.no_instrument;
    tracing::debug!(
        config = %cli.config.display(),
        solcover = %cli.solcover.display(),
        skip = ?coverage.skip_files,
        "configuration loaded"
    );

    let verbosity = cli.verbosity();
    let color: ColorChoice = cli.color.into();
    let ui = Ui::new(color.should_color(), verbosity.is_quiet());

    let toolchain = Toolchain::from_config(&coverage)?;
    let runner = CoverageRunner::new(project, coverage, toolchain, ui).with_options(RunOptions {
        version_only: cli.version_only,
    });

    Ok(runner.run(interrupt).await?)
}
