//! Instrumentation seam
//!
//! The instrumentation engine itself lives outside this crate. The runner
//! hands it the target sources and writes back whatever it returns.

use crate::error::{CoverageError, CoverageResult};
use crate::files::SourceFile;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;

/// Environment variable carrying the relative path of the file being instrumented
pub const FILE_ENV: &str = "SOLCOVER_FILE";

/// Rewrites contract sources to record statement and branch hits
#[async_trait::async_trait]
pub trait Instrumenter: Send + std::fmt::Debug {
    /// Instrument every target, keeping relative paths
    async fn instrument(&mut self, targets: Vec<SourceFile>) -> CoverageResult<Vec<SourceFile>>;
}

/// Returns sources unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughInstrumenter;

#[async_trait::async_trait]
impl Instrumenter for PassthroughInstrumenter {
    async fn instrument(&mut self, targets: Vec<SourceFile>) -> CoverageResult<Vec<SourceFile>> {
        Ok(targets)
    }
}

/// Runs a shell command per file: source on stdin, instrumented source on stdout
#[derive(Debug, Clone)]
pub struct CommandInstrumenter {
    command: String,
}

impl CommandInstrumenter {
    /// Create an instrumenter for the given shell command
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    async fn instrument_one(&self, file: SourceFile) -> CoverageResult<SourceFile> {
        let display = file.display_path();
        let fail = |message: String| CoverageError::instrumentation(display.clone(), message);

        let mut child = crate::process::shell(&self.command)
            .env(FILE_ENV, &display)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| fail(format!("failed to run `{}`: {e}", self.command)))?;

        // Stdin is fed while stdout is drained
        let writer = child.stdin.take().map(|mut stdin| {
            let source = file.source.clone();
            tokio::spawn(async move { stdin.write_all(source.as_bytes()).await })
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| fail(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let first_line = stderr.lines().find(|l| !l.trim().is_empty()).unwrap_or("");
            return Err(fail(format!("{} {first_line}", output.status)));
        }

        if let Some(writer) = writer {
            match writer.await {
                Ok(Ok(())) => {}
                // Exited successfully without reading all of its input
                Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Ok(Err(e)) => return Err(fail(format!("failed to write source: {e}"))),
                Err(e) => return Err(fail(format!("writer task failed: {e}"))),
            }
        }

        let source = String::from_utf8(output.stdout)
            .map_err(|_| fail("instrumented output is not valid UTF-8".to_string()))?;
        Ok(SourceFile {
            relative_path: file.relative_path,
            source,
        })
    }
}

#[async_trait::async_trait]
impl Instrumenter for CommandInstrumenter {
    async fn instrument(&mut self, targets: Vec<SourceFile>) -> CoverageResult<Vec<SourceFile>> {
        let mut instrumented = Vec::with_capacity(targets.len());
        for file in targets {
            tracing::debug!(file = %file.display_path(), "instrumenting");
            instrumented.push(self.instrument_one(file).await?);
        }
        Ok(instrumented)
    }
}
