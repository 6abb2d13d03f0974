//! Compilation of the instrumented contracts
//!
//! The compile command gets a generated build tool config file through
//! `{config}`; the file carries the temp layout, the coverage network and the
//! compiler settings with the optimizer turned off.

use crate::config::{CompilersConfig, NetworkConfig, ProjectConfig};
use crate::error::{CoverageError, CoverageResult};
use crate::files::TempLocations;
use crate::process::{render_command, run_command};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Config file handed to the compile command, inside the build directory
pub const SETTINGS_FILE: &str = "truffle-config.coverage.js";

/// Placeholder every compile command template must contain
pub const CONFIG_PLACEHOLDER: &str = "{config}";

/// Compiler input for a coverage run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileSettings {
    /// Project root
    pub working_directory: PathBuf,
    /// Instrumented sources
    pub contracts_directory: PathBuf,
    /// Build output root
    pub build_directory: PathBuf,
    /// Artifact output
    pub contracts_build_directory: PathBuf,
    /// Network the artifacts are deployed on
    pub network: String,
    /// Known networks, the coverage network included
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Recompile everything
    pub all: bool,
    /// Compiler settings
    pub compilers: CompilersConfig,
}

impl CompileSettings {
    /// Snapshot the compile-relevant parts of a project configuration
    #[must_use]
    pub fn from_project(project: &ProjectConfig) -> Self {
        Self {
            working_directory: project.working_directory.clone(),
            contracts_directory: project.contracts_directory.clone(),
            build_directory: project.build_directory.clone(),
            contracts_build_directory: project.contracts_build_directory.clone(),
            network: project.network_name().to_string(),
            networks: project.networks.clone(),
            all: project.all,
            compilers: project.compilers.clone(),
        }
    }

    /// Where the settings file goes
    #[must_use]
    pub fn settings_path(&self) -> PathBuf {
        self.build_directory.join(SETTINGS_FILE)
    }

    /// The settings as a build tool config module
    pub fn to_config_module(&self) -> CoverageResult<String> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| CoverageError::compile(format!("cannot serialize settings: {e}")))?;
        Ok(format!("module.exports = {json};\n"))
    }
}

/// Point a project at the temp layout and prepare it for a coverage compile
///
/// Artifacts keep the directory name they had in the project, under the temp
/// artifacts directory. The optimizer is always disabled: instrumented code
/// must not be rearranged.
pub fn use_temp_layout(project: &mut ProjectConfig, temp: &TempLocations) {
    let artifacts_name = project
        .contracts_build_directory
        .file_name()
        .map_or_else(|| PathBuf::from("contracts"), PathBuf::from);

    project.contracts_directory = temp.contracts.clone();
    project.build_directory = temp.artifacts.clone();
    project.contracts_build_directory = temp.artifacts.join(artifacts_name);
    project.all = true;
    project.compilers.solc.settings.optimizer.enabled = false;
}

/// Compiles contract sources into artifacts
#[async_trait::async_trait]
pub trait Compiler: Send + std::fmt::Debug {
    /// Compile with the given settings
    async fn compile(&mut self, settings: &CompileSettings) -> CoverageResult<()>;
}

/// Writes the settings to disk and runs a compile command template
///
/// Placeholders: `{config}` (settings file), `{contracts_dir}`, `{build_dir}`
/// (artifact directory) and `{root}`.
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    template: String,
}

impl CommandCompiler {
    /// Create a compiler for the given command template
    ///
    /// # Errors
    ///
    /// Returns an error if the template does not pass `{config}` to the
    /// compiler, since the optimizer setting would then never reach it.
    pub fn new(template: impl Into<String>) -> CoverageResult<Self> {
        let template = template.into();
        if !template.contains(CONFIG_PLACEHOLDER) {
            return Err(CoverageError::setting(
                "compile_command",
                format!("`{template}` must pass {CONFIG_PLACEHOLDER} to the compiler"),
            ));
        }
        Ok(Self { template })
    }

    /// Render the command line for the given settings
    #[must_use]
    pub fn command_line(&self, settings: &CompileSettings) -> String {
        let config = path_str(&settings.settings_path());
        let contracts_dir = path_str(&settings.contracts_directory);
        let build_dir = path_str(&settings.contracts_build_directory);
        let root = path_str(&settings.working_directory);
        render_command(
            &self.template,
            &[
                ("config", config.as_str()),
                ("contracts_dir", contracts_dir.as_str()),
                ("build_dir", build_dir.as_str()),
                ("root", root.as_str()),
            ],
        )
    }
}

#[async_trait::async_trait]
impl Compiler for CommandCompiler {
    async fn compile(&mut self, settings: &CompileSettings) -> CoverageResult<()> {
        let path = settings.settings_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, settings.to_config_module()?)?;
        tracing::debug!(path = %path.display(), "compile config written");

        let command = self.command_line(settings);
        run_command(&command, &settings.working_directory)
            .await
            .map_err(|e| match e {
                CoverageError::Process { message, .. } => {
                    CoverageError::compile(format!("`{command}` {message}"))
                }
                other => other,
            })
    }
}

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
