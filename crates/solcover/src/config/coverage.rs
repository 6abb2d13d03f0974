//! Coverage configuration (`.solcover.yml`)

use super::project::NetworkId;
use crate::error::{CoverageError, CoverageResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default coverage configuration file name
pub const DEFAULT_COVERAGE_FILE: &str = ".solcover.yml";

/// Command used to launch the local chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSpec {
    /// Executable
    pub command: String,
    /// Arguments; `{host}` and `{port}` are substituted
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for ClientSpec {
    fn default() -> Self {
        Self {
            command: "npx".to_string(),
            args: [
                "ganache-cli",
                "--host",
                "{host}",
                "--port",
                "{port}",
                "--gasLimit",
                "0xfffffffffff",
                "--allowUnlimitedContractSize",
                "--noVMErrorsOnRPCResponse",
            ]
            .iter()
            .map(ToString::to_string)
            .collect(),
        }
    }
}

impl ClientSpec {
    /// Arguments with `{host}` and `{port}` filled in
    #[must_use]
    pub fn rendered_args(&self, host: &str, port: u16) -> Vec<String> {
        let port = port.to_string();
        self.args
            .iter()
            .map(|arg| arg.replace("{host}", host).replace("{port}", &port))
            .collect()
    }
}

/// Coverage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverageConfig {
    /// Files or directories (relative to the contracts directory) copied
    /// without instrumentation; glob patterns are allowed
    #[serde(alias = "skipFiles")]
    pub skip_files: Vec<String>,
    /// Local chain override
    pub client: Option<ClientSpec>,
    /// Host for the coverage network
    pub host: String,
    /// Port for the coverage network
    pub port: u16,
    /// Network id for the coverage network
    pub network_id: NetworkId,
    /// Block gas limit for the coverage network
    pub gas: u64,
    /// Gas price for the coverage network
    pub gas_price: u64,
    /// Instrumentation command; source on stdin, instrumented source on stdout
    pub instrument_command: Option<String>,
    /// Copy sources unchanged when no instrumentation command is configured
    pub passthrough: bool,
    /// Compile command; `{config}`, `{contracts_dir}` and `{build_dir}` are substituted
    pub compile_command: String,
    /// Secondary build step run after compilation
    pub build_command: String,
    /// Test suite command
    pub test_command: String,
    /// Text on the test command's stderr that marks the suite as finished
    pub test_sentinel: Option<String>,
    /// Report command; `{coverage_dir}` and `{reporters}` are substituted
    pub report_command: Option<String>,
    /// Directory reports are written to, relative to the project root
    pub coverage_directory: PathBuf,
    /// Report formats handed to the report command
    pub istanbul_reporter: Vec<String>,
    /// How many times to check the node before giving up
    pub startup_attempts: u32,
    /// Delay between node checks in milliseconds
    pub startup_interval_ms: u64,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            skip_files: Vec::new(),
            client: None,
            host: "127.0.0.1".to_string(),
            port: 8555,
            network_id: NetworkId::default(),
            gas: 0xfff_ffff_ffff,
            gas_price: 0x01,
            instrument_command: None,
            passthrough: false,
            compile_command: "npx truffle compile --config {config} --all \
                              --contracts_directory {contracts_dir} \
                              --contracts_build_directory {build_dir}"
                .to_string(),
            build_command: "npm run build:cov".to_string(),
            test_command: "npm run test_cov".to_string(),
            test_sentinel: Some("Force exiting Jest".to_string()),
            report_command: None,
            coverage_directory: PathBuf::from("coverage"),
            istanbul_reporter: ["html", "lcov", "text", "json"]
                .iter()
                .map(ToString::to_string)
                .collect(),
            startup_attempts: 40,
            startup_interval_ms: 250,
        }
    }
}

impl CoverageConfig {
    /// Load a coverage configuration file
    pub fn load(path: &Path) -> CoverageResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoverageError::config(path, format!("cannot read file: {e}")))?;
        Self::from_yaml_str(&text).map_err(|message| CoverageError::config(path, message))
    }

    /// Load a coverage configuration file, or defaults when it does not exist
    pub fn load_or_default(path: &Path) -> CoverageResult<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no coverage config, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse a configuration from YAML text
    pub fn from_yaml_str(text: &str) -> Result<Self, String> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml_ng::from_str(text).map_err(|e| format!("invalid YAML: {e}"))
    }

    /// Append extra skip entries, ignoring ones already present
    #[must_use]
    pub fn with_extra_skips<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for entry in extra {
            let entry = entry.into();
            if !self.skip_files.contains(&entry) {
                self.skip_files.push(entry);
            }
        }
        self
    }

    /// The node command to launch, honoring the `client` override
    #[must_use]
    pub fn client_spec(&self) -> ClientSpec {
        self.client.clone().unwrap_or_default()
    }

    /// RPC endpoint of the coverage node
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }
}
