use std::{future::Future, io};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use hlive_engine::{ContainerSupervisor, StopReport};

use crate::HandleSlot;

/// Stops the current container when the process is asked to exit.
pub struct TerminationHandler {
    supervisor: ContainerSupervisor,
    slot: HandleSlot,
    cancel: CancellationToken,
}

impl TerminationHandler {
    pub fn new(supervisor: ContainerSupervisor, slot: HandleSlot, cancel: CancellationToken) -> Self {
        Self {
            supervisor,
            slot,
            cancel,
        }
    }

    /// Wait for `signal` (or for the token to be cancelled elsewhere), then
    /// shut down.
    ///
    /// If the signal listener cannot be installed the handler falls back to
    /// waiting for cancellation.
    pub async fn run<F>(self, signal: F) -> Option<StopReport>
    where
        F: Future<Output = io::Result<()>>,
    {
        tokio::select! {
            res = signal => match res {
                Ok(()) => info!(target: "hlive.core", "termination signal received, shutting down"),
                Err(e) => {
                    error!(target: "hlive.core", error = %e, "failed to listen for termination signals");
                    self.cancel.cancelled().await;
                }
            },
            _ = self.cancel.cancelled() => {
                debug!(target: "hlive.core", "shutdown requested");
            }
        }
        self.shutdown().await
    }

    /// Cancel the loop, take the current handle and stop it.
    ///
    /// Waits for a restart that currently holds the slot. Returns `None` when
    /// there was nothing to stop.
    pub async fn shutdown(&self) -> Option<StopReport> {
        self.cancel.cancel();
        let handle = self.slot.take().await?;
        let report = self.supervisor.stop(&handle).await;
        if report.is_clean() {
            info!(target: "hlive.core", container = %handle.id(), "container stopped");
        }
        Some(report)
    }
}

/// Resolves on SIGINT, SIGTERM or SIGQUIT (Ctrl-C elsewhere).
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> io::Result<()> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigquit = signal(SignalKind::quit())?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> io::Result<()> {
    tokio::signal::ctrl_c().await
}
