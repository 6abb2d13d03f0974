//! Interrupt handling
//!
//! The first interrupt resolves the shutdown future and the run cleans up. A
//! second interrupt while cleanup is still running kills the remaining child
//! process groups and exits immediately.

use crate::error::{CoverageResult, INTERRUPTED_EXIT_CODE};
use crate::process::kill_live_groups;
use async_trait::async_trait;
use std::future::Future;

/// A stream of interrupt notifications
#[async_trait]
trait Interrupts: Send + 'static {
    /// Wait for the next interrupt
    async fn next(&mut self);
}

#[cfg(unix)]
struct UnixSignals {
    interrupt: tokio::signal::unix::Signal,
    terminate: tokio::signal::unix::Signal,
}

#[cfg(unix)]
#[async_trait]
impl Interrupts for UnixSignals {
    async fn next(&mut self) {
        tokio::select! {
            _ = self.interrupt.recv() => tracing::warn!("SIGINT received"),
            _ = self.terminate.recv() => tracing::warn!("SIGTERM received"),
        }
    }
}

#[cfg(not(unix))]
struct CtrlC;

#[cfg(not(unix))]
#[async_trait]
impl Interrupts for CtrlC {
    async fn next(&mut self) {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("ctrl-c received");
        } else {
            std::future::pending::<()>().await;
        }
    }
}

/// Resolve on the first interrupt, then call `force` on the second
async fn first_interrupt<I, F>(mut interrupts: I, force: F)
where
    I: Interrupts,
    F: FnOnce() + Send + 'static,
{
    interrupts.next().await;
    tokio::spawn(async move {
        interrupts.next().await;
        tracing::warn!("second interrupt; exiting without cleanup");
        force();
    });
}

fn force_exit() {
    kill_live_groups();
    std::process::exit(i32::from(INTERRUPTED_EXIT_CODE));
}

/// Register interrupt handlers now and return a future that resolves on the
/// first interrupt
///
/// On unix both SIGINT and SIGTERM count. Handlers are installed before the
/// future is first polled, so a signal that arrives early is not lost.
#[cfg(unix)]
pub fn shutdown_signal() -> CoverageResult<impl Future<Output = ()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let signals = UnixSignals {
        interrupt: signal(SignalKind::interrupt())?,
        terminate: signal(SignalKind::terminate())?,
    };
    Ok(first_interrupt(signals, force_exit))
}

/// Register the ctrl-c handler and return a future that resolves on ctrl-c
#[cfg(not(unix))]
pub fn shutdown_signal() -> CoverageResult<impl Future<Output = ()>> {
    Ok(first_interrupt(CtrlC, force_exit))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[async_trait]
    impl Interrupts for mpsc::UnboundedReceiver<()> {
        async fn next(&mut self) {
            if self.recv().await.is_none() {
                std::future::pending::<()>().await;
            }
        }
    }

    fn forced_flag() -> (Arc<AtomicBool>, impl FnOnce() + Send + 'static) {
        let flag = Arc::new(AtomicBool::new(false));
        let set = Arc::clone(&flag);
        (flag, move || set.store(true, Ordering::SeqCst))
    }

    #[tokio::test]
    async fn test_first_interrupt_resolves_without_forcing() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (forced, force) = forced_flag();

        tx.send(()).unwrap();
        tokio::time::timeout(Duration::from_secs(5), first_interrupt(rx, force))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!forced.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_second_interrupt_forces_exit() {
        let (tx, rx) = mpsc::unbounded_channel();
        let (forced, force) = forced_flag();

        tx.send(()).unwrap();
        first_interrupt(rx, force).await;
        tx.send(()).unwrap();

        let mut seen = false;
        for _ in 0..100 {
            seen = forced.load(Ordering::SeqCst);
            if seen {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(seen, "second interrupt should force the exit");
    }

    #[tokio::test]
    async fn test_pending_until_first_interrupt() {
        let (_tx, rx) = mpsc::unbounded_channel::<()>();
        let (_, force) = forced_flag();
        let waited =
            tokio::time::timeout(Duration::from_millis(100), first_interrupt(rx, force)).await;
        assert!(waited.is_err());
    }
}
