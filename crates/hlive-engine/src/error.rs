use thiserror::Error;

use hlive_model::ContainerId;

/// Failure reported by an [`Engine`](crate::Engine) call.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine unreachable: {0}")]
    Unavailable(String),
    #[error("no such container: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("port is already allocated: {0}")]
    PortInUse(String),
    #[error("engine api error: {0}")]
    Api(String),
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

/// Container lifecycle failure as seen by the supervisor.
///
/// Only [`LifecycleError::EngineUnavailable`] and a failure of the very first
/// start are fatal; callers decide that, not this type.
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("container engine unavailable: {0}")]
    EngineUnavailable(#[source] EngineError),
    #[error("container create error: {0}")]
    Create(#[source] EngineError),
    #[error("container start error ({id}): {source}")]
    Start {
        id: ContainerId,
        #[source]
        source: EngineError,
    },
    #[error("host port {port} is already in use ({id}): {source}")]
    PortConflict {
        id: ContainerId,
        port: u16,
        #[source]
        source: EngineError,
    },
    #[error("container attach error ({id}): {source}")]
    Attach {
        id: ContainerId,
        #[source]
        source: EngineError,
    },
    #[error("error stopping container {id}: {source}")]
    Stop {
        id: ContainerId,
        #[source]
        source: EngineError,
    },
    #[error("error removing container {id}: {source}")]
    Remove {
        id: ContainerId,
        #[source]
        source: EngineError,
    },
    #[error("error waiting for container {id}: {source}")]
    Wait {
        id: ContainerId,
        #[source]
        source: EngineError,
    },
}

impl LifecycleError {
    /// `true` for create/start/port failures, i.e. no container came up.
    pub fn is_start_failure(&self) -> bool {
        matches!(
            self,
            LifecycleError::Create(_)
                | LifecycleError::Start { .. }
                | LifecycleError::PortConflict { .. }
        )
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
