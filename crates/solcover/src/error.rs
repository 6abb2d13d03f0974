//! Error types for a coverage run

use std::path::PathBuf;
use thiserror::Error;

/// Result type for coverage operations
pub type CoverageResult<T> = Result<T, CoverageError>;

/// Exit code reported when the run was interrupted by a signal
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Errors that can occur during a coverage run
#[derive(Debug, Error)]
pub enum CoverageError {
    /// Configuration could not be loaded or normalized
    #[error("Configuration error in {path}: {message}")]
    Config {
        /// File the error refers to
        path: PathBuf,
        /// Error message
        message: String,
    },

    /// A coverage setting is missing or unusable
    #[error("Invalid coverage setting `{key}`: {message}")]
    Setting {
        /// Setting name as written in the coverage configuration
        key: String,
        /// Error message
        message: String,
    },

    /// The local chain failed to start or stop
    #[error("Simulator error: {message}")]
    Simulator {
        /// Error message
        message: String,
    },

    /// JSON-RPC request against the local chain failed
    #[error("RPC error calling {method}: {message}")]
    Rpc {
        /// RPC method name
        method: String,
        /// Error message
        message: String,
    },

    /// Instrumentation of a contract source failed
    #[error("Instrumentation failed for {file}: {message}")]
    Instrumentation {
        /// Contract path relative to the contracts directory
        file: String,
        /// Error message
        message: String,
    },

    /// Compilation of the instrumented contracts failed
    #[error("Compilation failed: {message}")]
    Compile {
        /// Error message
        message: String,
    },

    /// A build or test command failed
    #[error("Command `{command}` failed: {message}")]
    Process {
        /// Command line that was run
        command: String,
        /// Exit code of the child, if it exited normally
        code: Option<i32>,
        /// Error message
        message: String,
    },

    /// Report generation failed
    #[error("Report generation failed: {message}")]
    Report {
        /// Error message
        message: String,
    },

    /// IO error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The run was interrupted by a signal
    #[error("Interrupted")]
    Interrupted,
}

impl CoverageError {
    /// Create a configuration error
    #[must_use]
    pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Config {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a setting error
    #[must_use]
    pub fn setting(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Setting {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a simulator error
    #[must_use]
    pub fn simulator(message: impl Into<String>) -> Self {
        Self::Simulator {
            message: message.into(),
        }
    }

    /// Create an RPC error
    #[must_use]
    pub fn rpc(method: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Rpc {
            method: method.into(),
            message: message.into(),
        }
    }

    /// Create an instrumentation error
    #[must_use]
    pub fn instrumentation(file: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Instrumentation {
            file: file.into(),
            message: message.into(),
        }
    }

    /// Create a compile error
    #[must_use]
    pub fn compile(message: impl Into<String>) -> Self {
        Self::Compile {
            message: message.into(),
        }
    }

    /// Create a process error
    #[must_use]
    pub fn process(command: impl Into<String>, code: Option<i32>, message: impl Into<String>) -> Self {
        Self::Process {
            command: command.into(),
            code,
            message: message.into(),
        }
    }

    /// Create a report generation error
    #[must_use]
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }

    /// Numeric process exit code for this error. Never zero.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Interrupted => INTERRUPTED_EXIT_CODE,
            Self::Process {
                code: Some(code), ..
            } => u8::try_from(*code).ok().filter(|c| *c != 0).unwrap_or(1),
            _ => 1,
        }
    }
}
