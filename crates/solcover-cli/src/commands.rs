//! CLI command definitions using clap

use clap::{Parser, ValueEnum};
use solcover::{ColorChoice, Verbosity};
use std::path::PathBuf;

/// Solcover: instrument contracts, run the test suite against a local chain
/// and report coverage
#[derive(Parser, Debug)]
#[command(name = "solcover")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Project configuration file
    #[arg(long, value_name = "FILE", default_value = "truffle-config.json")]
    pub config: PathBuf,

    /// Coverage configuration file; defaults are used when it does not exist
    #[arg(long, value_name = "FILE", default_value = ".solcover.yml")]
    pub solcover: PathBuf,

    /// Print version and network diagnostics, then stop
    #[arg(long)]
    pub version_only: bool,

    /// Copy a file or directory (relative to the contracts directory)
    /// without instrumenting it; may be repeated
    #[arg(long, value_name = "PATH")]
    pub skip: Vec<String>,

    /// Copy sources unchanged when no instrumentation command is configured
    #[arg(long)]
    pub no_instrument: bool,

    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorArg,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Cli {
    /// Verbosity selected by `-q` and `-v`
    #[must_use]
    pub const fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

/// Color argument
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
