use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use hlive_engine::{ContainerSupervisor, LifecycleError};
use hlive_model::{ContainerHandle, ContainerId, RunSpec};

use crate::HandleSlot;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RestartOutcome {
    Restarted(ContainerId),
    /// No container is running until the next successful restart.
    Failed,
    /// Shutdown won the race for the slot.
    Skipped,
}

/// Starts containers from the one immutable [`RunSpec`].
#[derive(Clone)]
pub(crate) struct Launcher {
    supervisor: ContainerSupervisor,
    spec: Arc<RunSpec>,
    slot: HandleSlot,
}

impl Launcher {
    pub(crate) fn new(supervisor: ContainerSupervisor, spec: Arc<RunSpec>, slot: HandleSlot) -> Self {
        Self {
            supervisor,
            spec,
            slot,
        }
    }

    /// Create, attach when [`RunSpec::interactive`] is set, then start.
    ///
    /// Returns `Ok(None)` when `cancel` fires before the start completes; the
    /// created container is force-removed. A failed attach leaves the
    /// container running unattached.
    pub(crate) async fn launch(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<ContainerHandle>, LifecycleError> {
        let mut handle = self.supervisor.create(&self.spec).await?;
        if cancel.is_cancelled() {
            self.supervisor.discard(&handle).await;
            return Ok(None);
        }
        if self.spec.interactive {
            if let Err(e) = self.supervisor.attach(&mut handle, true).await {
                warn!(target: "hlive.core", error = %e, "running without attached terminal");
            }
        }

        tokio::select! {
            res = self.supervisor.start_created(&handle, &self.spec) => {
                res?;
                Ok(Some(handle))
            }
            _ = cancel.cancelled() => {
                self.supervisor.discard(&handle).await;
                Ok(None)
            }
        }
    }

    /// Retire the current container and publish a fresh one.
    ///
    /// Holds the slot for the whole cycle and gives up as soon as `cancel`
    /// fires, so nothing starts behind a shutdown. `Ok(None)` means it gave up.
    pub(crate) async fn replace_current(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<ContainerId>, LifecycleError> {
        let mut current = self.slot.lock().await;
        if cancel.is_cancelled() {
            return Ok(None);
        }
        if let Some(old) = current.take() {
            self.supervisor.stop(&old).await;
            if cancel.is_cancelled() {
                return Ok(None);
            }
        }

        let Some(handle) = self.launch(cancel).await? else {
            return Ok(None);
        };
        let id = handle.id().clone();
        *current = Some(handle);
        Ok(Some(id))
    }

    /// One restart cycle as run by the coordinator.
    pub(crate) async fn restart(self, cancel: CancellationToken) -> RestartOutcome {
        info!(target: "hlive.core", "restarting container");
        match self.replace_current(&cancel).await {
            Ok(Some(id)) => {
                info!(target: "hlive.core", container = %id, "container restarted");
                RestartOutcome::Restarted(id)
            }
            Ok(None) => RestartOutcome::Skipped,
            Err(e) => {
                error!(target: "hlive.core", error = %e, "restart failed; waiting for the next change");
                RestartOutcome::Failed
            }
        }
    }
}
