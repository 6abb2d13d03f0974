//! Per-run state and the shared cleanup path

use crate::config::{CoverageConfig, ProjectConfig};
use crate::error::CoverageResult;
use crate::files::{remove_dir_if_exists, TempLocations};
use crate::simulator::Simulator;

/// Everything a run accumulates, plus the one place it is torn down
///
/// The context exists before any step runs, so an interrupt at any point
/// finds a valid cleanup target. Steps fill it in as they go.
#[derive(Debug)]
pub struct RunContext {
    /// Project configuration, mutated as steps redirect paths
    pub project: ProjectConfig,
    /// Coverage configuration
    pub coverage: CoverageConfig,
    /// Temp layout of this run
    pub temp: TempLocations,
    /// RPC address of the node, once started
    pub address: Option<String>,
    /// Node accounts, once fetched
    pub accounts: Vec<String>,
    simulator: Box<dyn Simulator>,
    temp_created: bool,
    finished: bool,
}

impl RunContext {
    /// Create the context for a run
    pub fn new(
        project: ProjectConfig,
        coverage: CoverageConfig,
        simulator: Box<dyn Simulator>,
    ) -> Self {
        let temp = TempLocations::for_project(&project);
        Self {
            project,
            coverage,
            temp,
            address: None,
            accounts: Vec::new(),
            simulator,
            temp_created: false,
            finished: false,
        }
    }

    /// Start the node and remember its address
    pub async fn start_simulator(&mut self) -> CoverageResult<String> {
        let address = self.simulator.start().await?;
        self.address = Some(address.clone());
        Ok(address)
    }

    /// Create the temp directories; they are removed again by [`Self::finish`]
    pub fn setup_temp(&mut self) -> CoverageResult<()> {
        self.temp_created = true;
        self.temp.setup()
    }

    /// Whether [`Self::finish`] has run
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished
    }

    /// Stop the node and remove temp directories created by this run
    ///
    /// Runs its side effects once; later calls return `Ok(())`. Every step is
    /// attempted even if an earlier one fails, and the first error is returned.
    pub async fn finish(&mut self) -> CoverageResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        tracing::debug!("finishing coverage run");

        let stopped = self.simulator.stop().await;

        let mut removed = Ok(());
        if self.temp_created {
            for dir in [&self.temp.contracts, &self.temp.artifacts] {
                if let Err(e) = remove_dir_if_exists(dir) {
                    tracing::warn!(dir = %dir.display(), error = %e, "failed to remove temp directory");
                    if removed.is_ok() {
                        removed = Err(e);
                    }
                }
            }
        }

        stopped.and(removed)
    }
}
