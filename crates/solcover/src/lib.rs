//! Solcover: coverage runs for smart-contract test suites
//!
//! Instruments contract sources, starts a local chain, compiles the
//! instrumented contracts, runs the project's tests against them and emits a
//! coverage report. The instrumentation engine, the node, the compiler, the
//! test runner and the report generator are external; this crate sequences
//! them and guarantees cleanup.
//!
//! ```rust,ignore
//! use solcover::{CoverageConfig, CoverageRunner, ProjectConfig, Toolchain, Ui};
//!
//! let project = ProjectConfig::load("truffle-config.json".as_ref())?;
//! let coverage = CoverageConfig::load_or_default(".solcover.yml".as_ref())?;
//! let toolchain = Toolchain::from_config(&coverage)?;
//! let runner = CoverageRunner::new(project, coverage, toolchain, Ui::default());
//! let summary = runner.run(solcover::shutdown_signal()?).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)] // Error types are self-documenting

pub mod compile;
pub mod config;
mod context;
mod error;
pub mod files;
pub mod instrument;
pub mod logging;
pub mod network;
pub mod process;
pub mod report;
pub mod rpc;
mod runner;
mod signal;
pub mod simulator;
mod ui;

pub use compile::{CommandCompiler, CompileSettings, Compiler};
pub use config::{
    ClientSpec, ColorChoice, CoverageConfig, NetworkConfig, NetworkId, ProjectConfig, Verbosity,
};
pub use context::RunContext;
pub use error::{CoverageError, CoverageResult, INTERRUPTED_EXIT_CODE};
pub use files::{assemble_files, AssembledFiles, SourceFile, TempLocations};
pub use instrument::{CommandInstrumenter, Instrumenter, PassthroughInstrumenter};
pub use process::TestCompletion;
pub use report::{CommandReportGenerator, ReportGenerator, ReportRequest};
pub use rpc::{NodeInfo, RpcClient};
pub use runner::{CoverageRunner, RunOptions, RunSummary, Toolchain, VERSION};
pub use signal::shutdown_signal;
pub use simulator::{AttachedSimulator, ProcessSimulator, Simulator};
pub use ui::{format_network, format_versions, Ui, UiCapture};
