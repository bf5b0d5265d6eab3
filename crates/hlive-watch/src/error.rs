use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("failed to create watcher: {0}")]
    Init(#[source] notify::Error),
    #[error("failed to watch {}: {source}", path.display())]
    Register {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    #[error("watcher error: {0}")]
    Backend(#[source] notify::Error),
}

impl WatchError {
    pub(crate) fn register(path: impl Into<PathBuf>, source: notify::Error) -> Self {
        WatchError::Register {
            path: path.into(),
            source,
        }
    }
}
