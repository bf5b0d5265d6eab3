use serde::{Deserialize, Serialize};

/// Reload-worthy filesystem change.
///
/// Metadata-only, access and rename-only notifications have no variant here:
/// they never reach the restart coordinator.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// File content was written.
    Write,
    /// A file or directory appeared.
    Create,
    /// A file or directory disappeared.
    Remove,
}

impl ChangeKind {
    /// Short identifier used in log fields.
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::Write => "write",
            ChangeKind::Create => "create",
            ChangeKind::Remove => "remove",
        }
    }
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
