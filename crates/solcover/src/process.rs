//! Child processes for the build and test steps
//!
//! Every shell command runs in its own process group. A [`ProcessGroup`]
//! guard signals the whole group when a step is abandoned, so grandchildren
//! such as `npm run` scripts do not outlive the run.

use crate::error::{CoverageError, CoverageResult};
use std::collections::BTreeSet;
use std::path::Path;
use std::process::Stdio;
use std::sync::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, Command};

/// How the test step was judged complete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestCompletion {
    /// The sentinel text appeared on the test command's stderr
    Sentinel,
    /// The test command exited successfully
    Exited,
}

/// Build a command that runs `command_line` through the platform shell, in a
/// new process group
#[must_use]
pub fn shell(command_line: &str) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", command_line]);
        cmd
    }
    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        cmd.args(["-c", command_line]);
        new_group(&mut cmd);
        cmd
    }
}

/// Make the command the leader of a new process group
pub fn new_group(cmd: &mut Command) -> &mut Command {
    #[cfg(unix)]
    cmd.process_group(0);
    cmd
}

/// Groups whose guard is still armed
static LIVE_GROUPS: Mutex<BTreeSet<u32>> = Mutex::new(BTreeSet::new());

fn live_groups() -> std::sync::MutexGuard<'static, BTreeSet<u32>> {
    LIVE_GROUPS
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Kill every process group that still has an armed guard
///
/// For exits that skip destructors.
pub fn kill_live_groups() {
    let pgids = std::mem::take(&mut *live_groups());
    for pgid in pgids {
        #[cfg(unix)]
        signal_group(pgid, nix::sys::signal::Signal::SIGKILL);
        #[cfg(not(unix))]
        let _ = pgid;
    }
}

/// The process group led by a spawned child
///
/// Dropping an armed guard kills every process left in the group. Call
/// [`ProcessGroup::release`] once the child finished normally.
#[derive(Debug)]
#[must_use]
pub struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    /// Guard the group of a child spawned through [`new_group`]
    pub fn of(child: &Child) -> Self {
        let pgid = child.id();
        if let Some(pgid) = pgid {
            live_groups().insert(pgid);
        }
        Self { pgid }
    }

    /// Ask every process in the group to exit
    ///
    /// Returns `false` where process groups are not available.
    pub fn terminate(&self) -> bool {
        #[cfg(unix)]
        {
            if let Some(pgid) = self.pgid {
                signal_group(pgid, nix::sys::signal::Signal::SIGTERM);
                return true;
            }
        }
        false
    }

    /// Kill every process in the group and disarm the guard
    pub fn kill(mut self) {
        self.kill_now();
    }

    /// Disarm the guard, leaving the group alone
    pub fn release(mut self) {
        if let Some(pgid) = self.pgid.take() {
            live_groups().remove(&pgid);
        }
    }

    fn kill_now(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            live_groups().remove(&pgid);
            #[cfg(unix)]
            signal_group(pgid, nix::sys::signal::Signal::SIGKILL);
            #[cfg(not(unix))]
            let _ = pgid;
        }
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill_now();
    }
}

#[cfg(unix)]
fn signal_group(pgid: u32, signal: nix::sys::signal::Signal) {
    use nix::errno::Errno;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pgid) else {
        return;
    };
    match nix::sys::signal::killpg(Pid::from_raw(raw), signal) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => tracing::warn!(pgid, ?signal, error = %e, "failed to signal process group"),
    }
}

/// Finds a byte sequence in a stream fed chunk by chunk
///
/// Matches across chunk boundaries and needs neither newlines nor valid UTF-8.
#[derive(Debug, Clone)]
pub struct SentinelScanner {
    needle: Vec<u8>,
    tail: Vec<u8>,
}

impl SentinelScanner {
    /// Scanner for `sentinel`; `None` for an empty sentinel
    #[must_use]
    pub fn new(sentinel: &str) -> Option<Self> {
        if sentinel.is_empty() {
            return None;
        }
        Some(Self {
            needle: sentinel.as_bytes().to_vec(),
            tail: Vec::new(),
        })
    }

    /// Feed the next chunk; `true` once the sentinel has been seen
    pub fn feed(&mut self, chunk: &[u8]) -> bool {
        self.tail.extend_from_slice(chunk);
        if self
            .tail
            .windows(self.needle.len())
            .any(|window| window == self.needle.as_slice())
        {
            return true;
        }
        let keep = self.needle.len() - 1;
        if self.tail.len() > keep {
            self.tail.drain(..self.tail.len() - keep);
        }
        false
    }
}

/// Fill `{name}` placeholders in a command template, quoting values for the shell
#[must_use]
pub fn render_command(template: &str, values: &[(&str, &str)]) -> String {
    values.iter().fold(template.to_string(), |acc, (key, value)| {
        acc.replace(&format!("{{{key}}}"), &shell_quote(value))
    })
}

/// Quote a value for `sh` when it contains anything but plain path characters
#[must_use]
pub fn shell_quote(value: &str) -> String {
    let plain = !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '.' | '_' | '-' | ':' | ',' | '='));
    if plain {
        value.to_string()
    } else {
        format!("'{}'", value.replace('\'', r"'\''"))
    }
}

/// Run a command to completion with inherited stdio
pub async fn run_command(command_line: &str, cwd: &Path) -> CoverageResult<()> {
    tracing::info!(command = command_line, cwd = %cwd.display(), "running command");

    let mut child = shell(command_line)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CoverageError::process(command_line, None, format!("failed to spawn: {e}")))?;
    let group = ProcessGroup::of(&child);

    let status = child.wait().await?;
    group.release();

    if status.success() {
        Ok(())
    } else {
        Err(CoverageError::process(
            command_line,
            status.code(),
            format!("exited with {status}"),
        ))
    }
}

/// Run the test command until it is done
///
/// The test command's stderr is forwarded as it arrives. The step completes
/// as soon as the stream contains `sentinel`, or when the command exits.
/// Exiting with a failure status before the sentinel appears is an error.
pub async fn run_tests(
    command_line: &str,
    cwd: &Path,
    sentinel: Option<&str>,
) -> CoverageResult<TestCompletion> {
    tracing::info!(command = command_line, ?sentinel, "running tests");

    let mut child = shell(command_line)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| CoverageError::process(command_line, None, format!("failed to spawn: {e}")))?;
    let group = ProcessGroup::of(&child);

    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| CoverageError::process(command_line, None, "stderr was not captured"))?;
    let mut scanner = sentinel.and_then(SentinelScanner::new);
    let mut forward = tokio::io::stderr();
    let mut chunk = vec![0u8; 8 * 1024];

    loop {
        let n = stderr.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        let _ = forward.write_all(&chunk[..n]).await;
        if scanner.as_mut().is_some_and(|s| s.feed(&chunk[..n])) {
            tracing::debug!("test sentinel seen");
            // Keep draining so the runner is not blocked on a full pipe while it exits
            tokio::spawn(async move {
                let _ = tokio::io::copy(&mut stderr, &mut forward).await;
                let _ = child.wait().await;
                group.release();
            });
            return Ok(TestCompletion::Sentinel);
        }
    }

    let status = child.wait().await?;
    group.release();
    if status.success() {
        Ok(TestCompletion::Exited)
    } else {
        Err(CoverageError::process(
            command_line,
            status.code(),
            format!("exited with {status}"),
        ))
    }
}
