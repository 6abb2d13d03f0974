//! Error types for the CLI

use thiserror::Error;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, CliError>;

/// Errors that can occur in the CLI
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid argument
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        /// Error message
        message: String,
    },

    /// Coverage run error
    #[error(transparent)]
    Coverage(#[from] solcover::CoverageError),
}

impl CliError {
    /// Create an invalid argument error
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::InvalidArgument { .. } => 2,
            Self::Coverage(e) => e.exit_code(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use solcover::CoverageError;

    #[test]
    fn test_invalid_argument_display() {
        let err = CliError::invalid_argument("empty --skip entry");
        assert_eq!(err.to_string(), "Invalid argument: empty --skip entry");
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_coverage_error_is_transparent() {
        let inner = CoverageError::compile("solc failed");
        let expected = inner.to_string();
        let err = CliError::from(inner);
        assert_eq!(err.to_string(), expected);
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_interrupt_exit_code() {
        let err = CliError::from(CoverageError::Interrupted);
        assert_eq!(err.exit_code(), solcover::INTERRUPTED_EXIT_CODE);
    }
}
