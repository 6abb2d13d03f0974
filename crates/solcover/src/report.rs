//! Coverage report emission

use crate::config::{CoverageConfig, ProjectConfig};
use crate::error::{CoverageError, CoverageResult};
use crate::process::{render_command, run_command};
use std::path::PathBuf;

/// What the report generator should produce and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRequest {
    /// Project root
    pub root: PathBuf,
    /// Output directory for reports
    pub coverage_dir: PathBuf,
    /// Report formats
    pub reporters: Vec<String>,
}

impl ReportRequest {
    /// Build a request from the run configuration
    #[must_use]
    pub fn new(project: &ProjectConfig, coverage: &CoverageConfig) -> Self {
        Self {
            root: project.working_directory.clone(),
            coverage_dir: project.working_directory.join(&coverage.coverage_directory),
            reporters: coverage.istanbul_reporter.clone(),
        }
    }
}

/// Turns collected coverage data into reports
#[async_trait::async_trait]
pub trait ReportGenerator: Send + std::fmt::Debug {
    /// Emit the report
    async fn report(&mut self, request: &ReportRequest) -> CoverageResult<()>;
}

/// Runs a report command template
///
/// Placeholders: `{coverage_dir}`, `{reporters}` (comma separated) and `{root}`.
#[derive(Debug, Clone)]
pub struct CommandReportGenerator {
    template: String,
}

impl CommandReportGenerator {
    /// Create a generator for the given command template
    #[must_use]
    pub fn new(template: impl Into<String>) -> Self {
        Self {
            template: template.into(),
        }
    }

    /// Render the command line for a request
    #[must_use]
    pub fn command_line(&self, request: &ReportRequest) -> String {
        let coverage_dir = request.coverage_dir.to_string_lossy().into_owned();
        let reporters = request.reporters.join(",");
        let root = request.root.to_string_lossy().into_owned();
        render_command(
            &self.template,
            &[
                ("coverage_dir", coverage_dir.as_str()),
                ("reporters", reporters.as_str()),
                ("root", root.as_str()),
            ],
        )
    }
}

#[async_trait::async_trait]
impl ReportGenerator for CommandReportGenerator {
    async fn report(&mut self, request: &ReportRequest) -> CoverageResult<()> {
        let command = self.command_line(request);
        std::fs::create_dir_all(&request.coverage_dir)?;
        run_command(&command, &request.root)
            .await
            .map_err(|e| match e {
                CoverageError::Process { message, .. } => {
                    CoverageError::report(format!("`{command}` {message}"))
                }
                other => other,
            })?;
        tracing::info!(dir = %request.coverage_dir.display(), "coverage report written");
        Ok(())
    }
}
