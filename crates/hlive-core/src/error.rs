use thiserror::Error;

use hlive_engine::LifecycleError;
use hlive_watch::WatchError;

/// Fatal outcomes of a serve loop or one-shot run.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    EngineUnavailable(LifecycleError),
    #[error("initial start failed: {0}")]
    InitialStart(#[source] LifecycleError),
    #[error("change detector failed: {0}")]
    Watch(#[from] WatchError),
    #[error("run failed: {0}")]
    Run(#[source] LifecycleError),
}
