//! Project (build tool) configuration

use crate::error::{CoverageError, CoverageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Default project configuration file name
pub const DEFAULT_PROJECT_FILE: &str = "truffle-config.json";

/// Temp directory override applied for coverage runs
pub const COVERAGE_TEMP: &str = "build";

/// Network override applied for coverage runs
pub const COVERAGE_NETWORK: &str = "coverage";

/// Network id, either numeric or a wildcard such as `*`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NetworkId {
    /// Numeric chain/network id
    Id(u64),
    /// Named id, usually `*` (match any)
    Name(String),
}

impl Default for NetworkId {
    fn default() -> Self {
        Self::Name("*".to_string())
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A named network entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Host the node listens on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Port the node listens on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    /// Network id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub network_id: Option<NetworkId>,
    /// Default sender account
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Gas limit
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gas: Option<u64>,
    /// Gas price
    #[serde(
        rename = "gasPrice",
        alias = "gas_price",
        skip_serializing_if = "Option::is_none"
    )]
    pub gas_price: Option<u64>,
}

/// Optimizer settings handed to solc
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptimizerSettings {
    /// Whether the optimizer runs
    pub enabled: bool,
    /// Optimizer runs parameter
    pub runs: u32,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            runs: 200,
        }
    }
}

/// Settings block of the solc compiler entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolcSettings {
    /// Optimizer settings
    pub optimizer: OptimizerSettings,
    /// Target EVM version
    #[serde(
        rename = "evmVersion",
        alias = "evm_version",
        skip_serializing_if = "Option::is_none"
    )]
    pub evm_version: Option<String>,
}

/// The solc compiler entry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolcConfig {
    /// Compiler version requirement
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    /// Compiler settings
    pub settings: SolcSettings,
}

/// Compilers section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilersConfig {
    /// Solidity compiler
    pub solc: SolcConfig,
}

/// Project configuration as loaded from the build tool's config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Project root; relative paths resolve against it
    pub working_directory: PathBuf,
    /// Contract sources
    pub contracts_directory: PathBuf,
    /// Build output root
    pub build_directory: PathBuf,
    /// Compiled contract artifacts; derived from `build_directory` when empty
    pub contracts_build_directory: PathBuf,
    /// Known networks
    pub networks: BTreeMap<String, NetworkConfig>,
    /// Compiler settings
    pub compilers: CompilersConfig,
    /// Temp directory name for compilation output
    pub temp: Option<String>,
    /// Selected network name
    pub network: Option<String>,
    /// Recompile everything, not just changed sources
    pub all: bool,
    /// Build tool version, shown in the version report
    pub build_tool_version: Option<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            working_directory: PathBuf::new(),
            contracts_directory: PathBuf::from("contracts"),
            build_directory: PathBuf::from("build"),
            contracts_build_directory: PathBuf::new(),
            networks: BTreeMap::new(),
            compilers: CompilersConfig::default(),
            temp: None,
            network: None,
            all: false,
            build_tool_version: None,
        }
    }
}

impl ProjectConfig {
    /// Load and normalize a project configuration file
    ///
    /// Relative directories are resolved against the directory that holds
    /// the file.
    pub fn load(path: &Path) -> CoverageResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| CoverageError::config(path, format!("cannot read file: {e}")))?;
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        Self::from_json_str(&text, &base).map_err(|message| CoverageError::config(path, message))
    }

    /// Parse and normalize a configuration from JSON text
    pub fn from_json_str(text: &str, base: &Path) -> Result<Self, String> {
        let config: Self = serde_json::from_str(text).map_err(|e| format!("invalid JSON: {e}"))?;
        Ok(config.normalize(base))
    }

    /// Resolve every directory to an absolute-or-base-relative path and fill
    /// in derived fields
    #[must_use]
    pub fn normalize(mut self, base: &Path) -> Self {
        self.working_directory = resolve(base, &self.working_directory);
        let wd = self.working_directory.clone();

        self.contracts_directory = resolve(&wd, &self.contracts_directory);
        self.build_directory = resolve(&wd, &self.build_directory);
        self.contracts_build_directory = if self.contracts_build_directory.as_os_str().is_empty() {
            self.build_directory.join("contracts")
        } else {
            resolve(&wd, &self.contracts_build_directory)
        };
        self
    }

    /// Apply the coverage overrides for `temp` and `network`
    #[must_use]
    pub fn with_coverage_overrides(mut self) -> Self {
        self.temp = Some(COVERAGE_TEMP.to_string());
        self.network = Some(COVERAGE_NETWORK.to_string());
        self
    }

    /// Name of the selected network, falling back to `development`
    #[must_use]
    pub fn network_name(&self) -> &str {
        self.network.as_deref().unwrap_or("development")
    }

    /// Entry of the selected network, if present
    #[must_use]
    pub fn selected_network(&self) -> Option<&NetworkConfig> {
        self.networks.get(self.network_name())
    }

    /// Build tool version string for reports
    #[must_use]
    pub fn build_tool_version(&self) -> &str {
        self.build_tool_version.as_deref().unwrap_or("unknown")
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.as_os_str().is_empty() {
        base.to_path_buf()
    } else if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
