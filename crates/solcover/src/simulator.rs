//! Local chain lifecycle
//!
//! The node is an external process. [`ProcessSimulator`] launches it, waits
//! until it answers JSON-RPC and tears it down again. [`AttachedSimulator`]
//! talks to a node somebody else manages.

use crate::config::{ClientSpec, CoverageConfig};
use crate::error::{CoverageError, CoverageResult};
use crate::process::{new_group, ProcessGroup};
use crate::rpc::RpcClient;
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// A local blockchain the test suite runs against
#[async_trait]
pub trait Simulator: Send + std::fmt::Debug {
    /// Start the node and return its RPC address
    async fn start(&mut self) -> CoverageResult<String>;

    /// Stop the node. Calling it again, or before `start`, is a no-op.
    async fn stop(&mut self) -> CoverageResult<()>;
}

/// How long a node gets to exit after SIGTERM before it is killed
const STOP_GRACE: Duration = Duration::from_secs(3);

/// A node launched as a child process, in its own process group
///
/// Launchers such as `npx` run the node as a grandchild, so stopping signals
/// the whole group rather than the direct child.
#[derive(Debug)]
pub struct ProcessSimulator {
    spec: ClientSpec,
    host: String,
    port: u16,
    attempts: u32,
    interval: Duration,
    child: Option<(Child, ProcessGroup)>,
}

impl ProcessSimulator {
    /// Create a simulator from the coverage configuration
    #[must_use]
    pub fn from_config(config: &CoverageConfig) -> Self {
        Self {
            spec: config.client_spec(),
            host: config.host.clone(),
            port: config.port,
            attempts: config.startup_attempts.max(1),
            interval: Duration::from_millis(config.startup_interval_ms),
            child: None,
        }
    }

    /// RPC endpoint the node will listen on
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    /// Whether a child process is currently held
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.child.is_some()
    }

    async fn wait_until_ready(&mut self, endpoint: &str) -> CoverageResult<()> {
        let rpc = RpcClient::new(endpoint);
        for attempt in 1..=self.attempts {
            if let Some((child, _)) = self.child.as_mut() {
                if let Some(status) = child.try_wait()? {
                    return Err(CoverageError::simulator(format!(
                        "`{}` exited during startup ({status})",
                        self.spec.command
                    )));
                }
            }

            match rpc.client_version().await {
                Ok(version) => {
                    tracing::debug!(attempt, %version, "node is ready");
                    return Ok(());
                }
                Err(e) => {
                    tracing::trace!(attempt, error = %e, "node not ready yet");
                }
            }
            tokio::time::sleep(self.interval).await;
        }

        Err(CoverageError::simulator(format!(
            "node at {endpoint} did not answer after {} attempts",
            self.attempts
        )))
    }
}

#[async_trait]
impl Simulator for ProcessSimulator {
    async fn start(&mut self) -> CoverageResult<String> {
        if self.child.is_some() {
            return Ok(self.endpoint());
        }

        let args = self.spec.rendered_args(&self.host, self.port);
        tracing::info!(command = %self.spec.command, ?args, "launching local chain");

        let mut command = Command::new(&self.spec.command);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        let child = new_group(&mut command).spawn().map_err(|e| {
            CoverageError::simulator(format!("failed to launch `{}`: {e}", self.spec.command))
        })?;
        let group = ProcessGroup::of(&child);
        self.child = Some((child, group));

        let endpoint = self.endpoint();
        if let Err(e) = self.wait_until_ready(&endpoint).await {
            self.stop().await?;
            return Err(e);
        }
        Ok(endpoint)
    }

    async fn stop(&mut self) -> CoverageResult<()> {
        let Some((mut child, group)) = self.child.take() else {
            return Ok(());
        };
        tracing::info!("stopping local chain");

        if !group.terminate() {
            child
                .start_kill()
                .map_err(|e| CoverageError::simulator(format!("failed to stop node: {e}")))?;
        }
        match tokio::time::timeout(STOP_GRACE, child.wait()).await {
            Ok(waited) => {
                waited.map_err(|e| CoverageError::simulator(format!("failed to stop node: {e}")))?;
            }
            Err(_) => {
                tracing::warn!(grace = ?STOP_GRACE, "node ignored SIGTERM; killing");
                child
                    .kill()
                    .await
                    .map_err(|e| CoverageError::simulator(format!("failed to stop node: {e}")))?;
            }
        }
        // Whatever the launcher left behind in the group
        group.kill();
        Ok(())
    }
}

/// A node that is already running; start and stop do not touch it
#[derive(Debug, Clone)]
pub struct AttachedSimulator {
    endpoint: String,
}

impl AttachedSimulator {
    /// Attach to the node at `endpoint`
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl Simulator for AttachedSimulator {
    async fn start(&mut self) -> CoverageResult<String> {
        Ok(self.endpoint.clone())
    }

    async fn stop(&mut self) -> CoverageResult<()> {
        Ok(())
    }
}
