use std::{pin::Pin, time::Duration};

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio::io::AsyncWrite;

use hlive_model::{ContainerId, RunSpec};

use crate::EngineResult;

/// Container output, chunked as the engine delivers it (stdout and stderr interleaved).
pub type OutputStream = BoxStream<'static, EngineResult<Vec<u8>>>;

/// Writable end of the container's stdin.
pub type InputSink = Pin<Box<dyn AsyncWrite + Send>>;

/// Duplex stream opened by [`Engine::attach`].
pub struct Attachment {
    pub output: OutputStream,
    /// Present only when stdin was requested.
    pub input: Option<InputSink>,
}

/// The container engine API consumed by [`ContainerSupervisor`](crate::ContainerSupervisor).
///
/// Implementations map one call to one engine request; retries, ordering and
/// error policy live in the supervisor.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Check that the engine endpoint answers at all.
    async fn ping(&self) -> EngineResult<()>;

    /// Create (but do not start) a container from `spec`.
    async fn create(&self, spec: &RunSpec) -> EngineResult<ContainerId>;

    async fn start(&self, id: &ContainerId) -> EngineResult<()>;

    /// Open stdout/stderr, and stdin when `stdin` is set.
    async fn attach(&self, id: &ContainerId, stdin: bool) -> EngineResult<Attachment>;

    /// Ask the container to stop, killing it after `grace`.
    async fn stop(&self, id: &ContainerId, grace: Duration) -> EngineResult<()>;

    /// Force-remove the container.
    async fn remove(&self, id: &ContainerId) -> EngineResult<()>;

    /// Block until the container is not running and return its exit status.
    async fn wait(&self, id: &ContainerId) -> EngineResult<i64>;
}
