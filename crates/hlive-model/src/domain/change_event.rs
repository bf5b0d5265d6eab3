use std::path::PathBuf;
use std::time::SystemTime;

use crate::ChangeKind;

/// A reload-worthy change observed under the watch root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
    /// Wall-clock arrival time.
    pub at: SystemTime,
}

impl ChangeEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
            at: SystemTime::now(),
        }
    }
}

/// "Exactly one restart is due now."
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RestartRequest;
