//! Solcover CLI: coverage for contract test suites
//!
//! ## Usage
//!
//! ```bash
//! solcover                                 # Full coverage run
//! solcover --version-only                  # Versions and network only
//! solcover --skip Migrations.sol --skip mocks
//! solcover --config truffle-config.json --solcover .solcover.yml -v
//! ```

use clap::Parser;
use solcover_cli::Cli;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    solcover::logging::init(cli.verbosity(), cli.log_json);

    match solcover_cli::run(&cli).await {
        Ok(summary) => {
            tracing::info!(
                instrumented = summary.instrumented.len(),
                skipped = summary.skipped.len(),
                version_only = summary.version_only,
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(e.exit_code())
        }
    }
}
