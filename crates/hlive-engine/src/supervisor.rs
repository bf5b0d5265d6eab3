//! Lifecycle operations for the single active container.
//!
//! `create` / `start` / `attach` / `stop` are the only ways hlive touches the
//! engine during a serve loop. `stop` never fails its caller: a stuck or
//! already removed container must not block the next start.

use std::{sync::Arc, time::Duration};

use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use hlive_model::{ContainerHandle, RunSpec};

use crate::{
    Attachment, Engine, EngineError, InputPump, LifecycleError, util::spawn_output_forwarder,
};

/// Grace period given to `stop` before the engine kills the container.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    pub stop_grace: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }
}

/// Output copy task opened by [`ContainerSupervisor::attach`].
///
/// Nothing cancels it; it ends when the stream closes or is abandoned together
/// with the handle.
pub struct Forwarders {
    pub output: JoinHandle<u64>,
    /// Process stdin now feeds this container.
    pub stdin_routed: bool,
}

/// Everything that went wrong during a best-effort stop + remove.
#[derive(Debug, Default)]
pub struct StopReport {
    pub errors: Vec<LifecycleError>,
}

impl StopReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Clone)]
pub struct ContainerSupervisor {
    engine: Arc<dyn Engine>,
    cfg: SupervisorConfig,
    input: InputPump,
}

impl ContainerSupervisor {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            cfg: SupervisorConfig::default(),
            input: InputPump::stdin(),
        }
    }

    pub fn with_config(mut self, cfg: SupervisorConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Replace the stdin source shared by every interactive attach.
    pub fn with_input(mut self, input: InputPump) -> Self {
        self.input = input;
        self
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Fail fast when the engine endpoint cannot be reached.
    pub async fn ensure_engine(&self) -> Result<(), LifecycleError> {
        self.engine
            .ping()
            .await
            .map_err(LifecycleError::EngineUnavailable)?;
        debug!(target: "hlive.engine", engine = self.engine.name(), "engine reachable");
        Ok(())
    }

    /// Create a container from `spec` without starting it.
    ///
    /// A missing bind source is only a warning; the engine decides whether the
    /// container can run without it.
    #[instrument(level = "debug", skip(self, spec), fields(image = %spec.image))]
    pub async fn create(&self, spec: &RunSpec) -> Result<ContainerHandle, LifecycleError> {
        for mount in &spec.mounts {
            if !mount.source.exists() {
                warn!(
                    target: "hlive.engine",
                    source = %mount.source.display(),
                    target_path = %mount.target,
                    "bind source not found; the container may exit if it needs it"
                );
            }
        }

        let id = self
            .engine
            .create(spec)
            .await
            .map_err(LifecycleError::Create)?;
        debug!(target: "hlive.engine", container = %id, "created container");
        Ok(ContainerHandle::new(id))
    }

    /// Start a container returned by [`create`](Self::create).
    ///
    /// On failure the container is force-removed before the error is returned.
    pub async fn start_created(
        &self,
        handle: &ContainerHandle,
        spec: &RunSpec,
    ) -> Result<(), LifecycleError> {
        let id = handle.id();
        if let Err(source) = self.engine.start(id).await {
            self.discard(handle).await;
            let port = match (&source, &spec.port) {
                (EngineError::PortInUse(_), Some(port)) => Some(port.host_port),
                _ => None,
            };
            let id = id.clone();
            return Err(match port {
                Some(port) => LifecycleError::PortConflict { id, port, source },
                None => LifecycleError::Start { id, source },
            });
        }

        info!(target: "hlive.engine", container = %id, "started container");
        Ok(())
    }

    /// Create and start a container from `spec`.
    pub async fn start(&self, spec: &RunSpec) -> Result<ContainerHandle, LifecycleError> {
        let handle = self.create(spec).await?;
        self.start_created(&handle, spec).await?;
        Ok(handle)
    }

    /// Force-remove a container that never became current.
    pub async fn discard(&self, handle: &ContainerHandle) {
        self.input.release(handle.id()).await;
        if let Err(e) = self.engine.remove(handle.id()).await {
            debug!(target: "hlive.engine", container = %handle.id(), error = %e, "cleanup of unstarted container failed");
        }
    }

    /// Attach the process stdout (and stdin when `interactive`) to the container.
    ///
    /// Works on created and running containers; attaching before start keeps
    /// the first lines of a short-lived run.
    pub async fn attach(
        &self,
        handle: &mut ContainerHandle,
        interactive: bool,
    ) -> Result<Forwarders, LifecycleError> {
        self.attach_with(handle, interactive, tokio::io::stdout())
            .await
    }

    /// [`attach`](Self::attach) with an explicit output sink.
    pub async fn attach_with<W>(
        &self,
        handle: &mut ContainerHandle,
        interactive: bool,
        sink: W,
    ) -> Result<Forwarders, LifecycleError>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let id = handle.id().clone();
        let Attachment { output, input } = self
            .engine
            .attach(&id, interactive)
            .await
            .map_err(|source| LifecycleError::Attach {
                id: id.clone(),
                source,
            })?;

        let output = spawn_output_forwarder(output, sink, id.clone());
        let stdin_routed = match (interactive, input) {
            (true, Some(input)) => {
                self.input.route(id.clone(), input).await;
                true
            }
            _ => false,
        };

        handle.mark_attached();
        debug!(target: "hlive.engine", container = %id, interactive, "attached");
        Ok(Forwarders {
            output,
            stdin_routed,
        })
    }

    /// Stop with the configured grace period, then force-remove.
    ///
    /// Removal is attempted whatever the stop outcome. Errors are logged and
    /// collected, never returned.
    pub async fn stop(&self, handle: &ContainerHandle) -> StopReport {
        let id = handle.id();
        info!(target: "hlive.engine", container = %id, "stopping container");
        self.input.release(id).await;

        let mut report = StopReport::default();
        if let Err(source) = self.engine.stop(id, self.cfg.stop_grace).await {
            let err = LifecycleError::Stop {
                id: id.clone(),
                source,
            };
            warn!(target: "hlive.engine", error = %err, "stop failed");
            report.errors.push(err);
        }
        if let Err(source) = self.engine.remove(id).await {
            let err = LifecycleError::Remove {
                id: id.clone(),
                source,
            };
            warn!(target: "hlive.engine", error = %err, "remove failed");
            report.errors.push(err);
        }
        report
    }

    /// Wait until the container stops running and return its exit status.
    pub async fn wait(&self, handle: &ContainerHandle) -> Result<i64, LifecycleError> {
        let id = handle.id();
        let status = self
            .engine
            .wait(id)
            .await
            .map_err(|source| LifecycleError::Wait {
                id: id.clone(),
                source,
            })?;
        debug!(target: "hlive.engine", container = %id, status, "container exited");
        Ok(status)
    }
}
