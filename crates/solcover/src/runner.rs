//! The coverage pipeline
//!
//! A straight line of steps: start the node, report versions, instrument,
//! compile, build, test, report. Any failure, and any interrupt, ends the
//! line; cleanup then runs exactly once through [`RunContext::finish`].

use crate::compile::{use_temp_layout, CommandCompiler, CompileSettings, Compiler};
use crate::config::{CoverageConfig, ProjectConfig};
use crate::context::RunContext;
use crate::error::{CoverageError, CoverageResult};
use crate::files::{assemble_files, save, SourceFile};
use crate::instrument::{CommandInstrumenter, Instrumenter, PassthroughInstrumenter};
use crate::network::{node_version, set_network, set_network_from};
use crate::process::{run_command, run_tests, TestCompletion};
use crate::report::{CommandReportGenerator, ReportGenerator, ReportRequest};
use crate::rpc::RpcClient;
use crate::simulator::{ProcessSimulator, Simulator};
use crate::ui::Ui;
use std::future::Future;

/// Version reported for this tool
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The external collaborators a run drives
#[derive(Debug)]
pub struct Toolchain {
    /// Local chain
    pub simulator: Box<dyn Simulator>,
    /// Instrumentation engine
    pub instrumenter: Box<dyn Instrumenter>,
    /// Contract compiler
    pub compiler: Box<dyn Compiler>,
    /// Report generator
    pub reporter: Box<dyn ReportGenerator>,
}

impl Toolchain {
    /// Process-backed collaborators as described by the coverage configuration
    ///
    /// # Errors
    ///
    /// Fails before anything is launched when the configuration cannot
    /// produce coverage: no instrumentation command (unless `passthrough` is
    /// set), no report command, or a compile command without `{config}`.
    pub fn from_config(coverage: &CoverageConfig) -> CoverageResult<Self> {
        let instrumenter: Box<dyn Instrumenter> = match configured(coverage.instrument_command.as_deref()) {
            Some(command) => Box::new(CommandInstrumenter::new(command)),
            None if coverage.passthrough => {
                tracing::warn!("passthrough enabled; sources are copied unchanged");
                Box::new(PassthroughInstrumenter)
            }
            None => {
                return Err(CoverageError::setting(
                    "instrument_command",
                    "not configured; set it, or enable `passthrough` to copy sources unchanged",
                ))
            }
        };
        let Some(report_command) = configured(coverage.report_command.as_deref()) else {
            return Err(CoverageError::setting(
                "report_command",
                "not configured; no coverage report would be written",
            ));
        };

        Ok(Self {
            simulator: Box::new(ProcessSimulator::from_config(coverage)),
            instrumenter,
            compiler: Box::new(CommandCompiler::new(coverage.compile_command.clone())?),
            reporter: Box::new(CommandReportGenerator::new(report_command)),
        })
    }
}

fn configured(command: Option<&str>) -> Option<&str> {
    command.filter(|c| !c.trim().is_empty())
}

/// Flags for a single run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Stop after printing version and network diagnostics
    pub version_only: bool,
}

/// What a finished run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Node version segment
    pub node_version: String,
    /// Number of node accounts
    pub accounts: usize,
    /// Instrumented files, relative to the contracts directory
    pub instrumented: Vec<String>,
    /// Files copied without instrumentation
    pub skipped: Vec<String>,
    /// Whether the run stopped after the version report
    pub version_only: bool,
    /// How the test step ended
    pub tests: Option<TestCompletion>,
}

/// Drives one coverage run
#[derive(Debug)]
pub struct CoverageRunner {
    project: ProjectConfig,
    coverage: CoverageConfig,
    instrumenter: Box<dyn Instrumenter>,
    compiler: Box<dyn Compiler>,
    reporter: Box<dyn ReportGenerator>,
    simulator: Box<dyn Simulator>,
    ui: Ui,
    options: RunOptions,
}

impl CoverageRunner {
    /// Create a runner; the project gets its coverage overrides applied here
    #[must_use]
    pub fn new(
        project: ProjectConfig,
        coverage: CoverageConfig,
        toolchain: Toolchain,
        ui: Ui,
    ) -> Self {
        Self {
            project: project.with_coverage_overrides(),
            coverage,
            instrumenter: toolchain.instrumenter,
            compiler: toolchain.compiler,
            reporter: toolchain.reporter,
            simulator: toolchain.simulator,
            ui,
            options: RunOptions::default(),
        }
    }

    /// Set run options
    #[must_use]
    pub const fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Run the pipeline until it completes, fails, or `interrupt` resolves
    ///
    /// Cleanup runs exactly once on every path. A pipeline error wins over a
    /// cleanup error; a cleanup error alone still fails the run.
    pub async fn run<F>(self, interrupt: F) -> CoverageResult<RunSummary>
    where
        F: Future<Output = ()>,
    {
        let Self {
            project,
            coverage,
            mut instrumenter,
            mut compiler,
            mut reporter,
            simulator,
            ui,
            options,
        } = self;

        let mut ctx = RunContext::new(project, coverage, simulator);
        let mut steps = Steps {
            instrumenter: instrumenter.as_mut(),
            compiler: compiler.as_mut(),
            reporter: reporter.as_mut(),
            ui: &ui,
            options,
        };

        let outcome = tokio::select! {
            biased;
            () = interrupt => Err(CoverageError::Interrupted),
            result = steps.run(&mut ctx) => result,
        };

        let cleanup = ctx.finish().await;
        match (outcome, cleanup) {
            (Ok(summary), Ok(())) => Ok(summary),
            (Ok(_), Err(e)) => {
                ui.failure(&format!("cleanup failed: {e}"));
                Err(e)
            }
            (Err(e), cleanup) => {
                if let Err(cleanup_err) = cleanup {
                    tracing::warn!(error = %cleanup_err, "cleanup failed after error");
                }
                ui.failure(&e.to_string());
                Err(e)
            }
        }
    }
}

struct Steps<'a> {
    instrumenter: &'a mut dyn Instrumenter,
    compiler: &'a mut dyn Compiler,
    reporter: &'a mut dyn ReportGenerator,
    ui: &'a Ui,
    options: RunOptions,
}

impl Steps<'_> {
    async fn run(&mut self, ctx: &mut RunContext) -> CoverageResult<RunSummary> {
        let mut summary = RunSummary::default();

        // Node
        set_network(&mut ctx.project, &ctx.coverage);
        let address = ctx.start_simulator().await?;
        let rpc = RpcClient::new(&address);
        let info = rpc.node_info().await?;
        set_network_from(&mut ctx.project, &info.accounts);
        ctx.accounts.clone_from(&info.accounts);

        summary.node_version = node_version(&info.client_version).to_string();
        summary.accounts = info.accounts.len();
        tracing::info!(%address, accounts = summary.accounts, "node ready");

        self.ui.versions(
            ctx.project.build_tool_version(),
            &summary.node_version,
            VERSION,
        );

        if self.options.version_only {
            summary.version_only = true;
            return Ok(summary);
        }

        let network = ctx.project.selected_network().cloned().unwrap_or_default();
        self.ui.network(
            ctx.project.network_name(),
            &network
                .network_id
                .map_or_else(|| "*".to_string(), |id| id.to_string()),
            network.port.unwrap_or(ctx.coverage.port),
        );

        // Instrument
        let assembled = assemble_files(&ctx.project.contracts_directory, &ctx.coverage.skip_files)?;
        if assembled.is_empty() {
            self.ui.warning("no contract sources found");
        }
        let skipped = assembled.skipped;
        let targets = self.instrumenter.instrument(assembled.targets).await?;
        self.ui.skipped(&skipped);

        summary.instrumented = targets.iter().map(SourceFile::display_path).collect();
        summary.skipped = skipped.iter().map(SourceFile::display_path).collect();

        // Temp layout
        ctx.setup_temp()?;
        save(&targets, &ctx.temp.contracts)?;
        save(&skipped, &ctx.temp.contracts)?;
        let temp = ctx.temp.clone();
        use_temp_layout(&mut ctx.project, &temp);

        // Compile
        self.ui.info("compiling instrumented contracts");
        let settings = CompileSettings::from_project(&ctx.project);
        self.compiler.compile(&settings).await?;

        // Build and test
        let root = ctx.project.working_directory.clone();
        if ctx.coverage.build_command.trim().is_empty() {
            tracing::debug!("no build command configured");
        } else {
            run_command(&ctx.coverage.build_command, &root).await?;
        }

        let completion = run_tests(
            &ctx.coverage.test_command,
            &root,
            ctx.coverage.test_sentinel.as_deref(),
        )
        .await?;
        summary.tests = Some(completion);

        // Report
        let request = ReportRequest::new(&ctx.project, &ctx.coverage);
        self.reporter.report(&request).await?;
        self.ui.success("coverage run complete");

        Ok(summary)
    }
}
