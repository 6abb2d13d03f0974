//! Configuration for a coverage run
//!
//! Two files feed a run:
//!
//! - the project configuration (`truffle-config.json`), describing where
//!   contracts live, where artifacts go, networks and compiler settings
//! - the coverage configuration (`.solcover.yml`), describing what to skip,
//!   which node to launch and which commands drive each step
//!
//! The runner overrides `temp` and `network` on the project configuration so
//! compilation lands in a temporary directory and talks to the coverage node.

mod coverage;
mod output;
mod project;

pub use coverage::{ClientSpec, CoverageConfig, DEFAULT_COVERAGE_FILE};
pub use output::{ColorChoice, Verbosity};
pub use project::{
    CompilersConfig, NetworkConfig, NetworkId, OptimizerSettings, ProjectConfig, SolcConfig,
    SolcSettings, COVERAGE_NETWORK, COVERAGE_TEMP, DEFAULT_PROJECT_FILE,
};
