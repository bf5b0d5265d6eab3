mod change;
pub use change::ChangeKind;

mod host;
pub use host::{HostOs, mount_source};
