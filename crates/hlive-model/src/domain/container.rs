use std::fmt;

use serde::{Deserialize, Serialize};

/// Engine-assigned container identifier.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 characters, the way `docker ps` prints ids.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short())
    }
}

impl From<String> for ContainerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for ContainerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// The running container plus whether its I/O is attached.
///
/// Not `Clone`: a handle has exactly one owner at a time.
#[derive(Debug, PartialEq, Eq)]
pub struct ContainerHandle {
    id: ContainerId,
    attached: bool,
}

impl ContainerHandle {
    pub fn new(id: ContainerId) -> Self {
        Self {
            id,
            attached: false,
        }
    }

    pub fn id(&self) -> &ContainerId {
        &self.id
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn mark_attached(&mut self) {
        self.attached = true;
    }
}
