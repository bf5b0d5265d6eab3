//! [`Engine`] backed by the local Docker daemon through `bollard`.

use std::{collections::HashMap, time::Duration};

use async_trait::async_trait;
use bollard::{
    Docker,
    container::{
        AttachContainerOptions, AttachContainerResults, Config, CreateContainerOptions,
        RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
        WaitContainerOptions,
    },
    errors::Error as DockerError,
    models::{HostConfig, Mount, MountTypeEnum, PortBinding},
};
use futures::StreamExt;
use tracing::{trace, warn};

use hlive_model::{ContainerId, RunSpec};

use crate::{Attachment, Engine, EngineError, EngineResult};

pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect using `DOCKER_HOST` or the platform default socket.
    ///
    /// This does not touch the daemon yet; use [`Engine::ping`] for that.
    pub fn connect() -> EngineResult<Self> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| EngineError::Unavailable(e.to_string()))?;
        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }
}

impl From<DockerError> for EngineError {
    fn from(e: DockerError) -> Self {
        match e {
            DockerError::DockerResponseServerError {
                status_code,
                message,
            } => classify_response(status_code, message),
            other => EngineError::Api(other.to_string()),
        }
    }
}

fn classify_response(status: u16, message: String) -> EngineError {
    if message.contains("port is already allocated") || message.contains("address already in use")
    {
        return EngineError::PortInUse(message);
    }
    match status {
        404 => EngineError::NotFound(message),
        409 => EngineError::Conflict(message),
        _ => EngineError::Api(format!("{status}: {message}")),
    }
}

/// Translate a [`RunSpec`] into the engine's create request.
pub(crate) fn container_config(spec: &RunSpec) -> Config<String> {
    let mounts = spec
        .mounts
        .iter()
        .map(|m| Mount {
            typ: Some(MountTypeEnum::BIND),
            source: Some(m.source.to_string_lossy().into_owned()),
            target: Some(m.target.clone()),
            ..Default::default()
        })
        .collect::<Vec<_>>();

    let (exposed_ports, port_bindings) = match &spec.port {
        Some(port) => {
            let key = port.container_key();
            let exposed = HashMap::from([(key.clone(), HashMap::new())]);
            let bindings = HashMap::from([(
                key,
                Some(vec![PortBinding {
                    host_ip: Some(port.host_ip.clone()),
                    host_port: Some(port.host_port.to_string()),
                }]),
            )]);
            (Some(exposed), Some(bindings))
        }
        None => (None, None),
    };

    Config {
        image: Some(spec.image.clone()),
        cmd: (!spec.command.is_empty()).then(|| spec.command.clone()),
        tty: Some(spec.interactive),
        open_stdin: Some(spec.interactive),
        attach_stdin: Some(spec.interactive),
        attach_stdout: Some(true),
        attach_stderr: Some(true),
        exposed_ports,
        host_config: Some(HostConfig {
            mounts: (!mounts.is_empty()).then_some(mounts),
            port_bindings,
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[async_trait]
impl Engine for DockerEngine {
    fn name(&self) -> &'static str {
        "docker"
    }

    async fn ping(&self) -> EngineResult<()> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| EngineError::Unavailable(e.to_string()))
    }

    async fn create(&self, spec: &RunSpec) -> EngineResult<ContainerId> {
        let created = self
            .docker
            .create_container(None::<CreateContainerOptions<String>>, container_config(spec))
            .await?;
        for warning in &created.warnings {
            warn!(target: "hlive.engine.docker", %warning, "engine warning on create");
        }
        Ok(ContainerId::new(created.id))
    }

    async fn start(&self, id: &ContainerId) -> EngineResult<()> {
        self.docker
            .start_container(id.as_str(), None::<StartContainerOptions<String>>)
            .await?;
        Ok(())
    }

    async fn attach(&self, id: &ContainerId, stdin: bool) -> EngineResult<Attachment> {
        let options = AttachContainerOptions::<String> {
            stdin: Some(stdin),
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            // Replay what was printed between start and attach.
            logs: Some(true),
            detach_keys: None,
        };
        let AttachContainerResults { output, input } = self
            .docker
            .attach_container(id.as_str(), Some(options))
            .await?;

        let output = output
            .map(|chunk| {
                chunk
                    .map(|log| log.into_bytes().to_vec())
                    .map_err(EngineError::from)
            })
            .boxed();
        Ok(Attachment {
            output,
            input: stdin.then_some(input),
        })
    }

    async fn stop(&self, id: &ContainerId, grace: Duration) -> EngineResult<()> {
        let options = StopContainerOptions {
            t: grace.as_secs() as i64,
        };
        match self.docker.stop_container(id.as_str(), Some(options)).await {
            Ok(()) => Ok(()),
            // 304: already stopped.
            Err(DockerError::DockerResponseServerError {
                status_code: 304, ..
            }) => {
                trace!(target: "hlive.engine.docker", container = %id, "already stopped");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, id: &ContainerId) -> EngineResult<()> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id.as_str(), Some(options))
            .await?;
        Ok(())
    }

    async fn wait(&self, id: &ContainerId) -> EngineResult<i64> {
        let options = WaitContainerOptions {
            condition: "not-running",
        };
        let mut stream = self.docker.wait_container(id.as_str(), Some(options));
        match stream.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // bollard reports a non-zero exit as an error carrying the code.
            Some(Err(DockerError::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(e.into()),
            None => Err(EngineError::Api("wait stream ended without a status".into())),
        }
    }
}
