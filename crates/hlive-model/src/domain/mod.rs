mod run_spec;
pub use run_spec::{BindMount, PortMapping, RunSpec};

mod container;
pub use container::{ContainerHandle, ContainerId};

mod change_event;
pub use change_event::{ChangeEvent, RestartRequest};

/// Container path the site directory is mounted at.
pub const SITE_MOUNT_TARGET: &str = "/home/UserRepo";

/// Container path the generator config file is mounted at.
pub const CONFIG_MOUNT_TARGET: &str = "/home/CentralRepo/hugo.toml";

/// Name of the generator config file looked up in the watch root.
pub const CONFIG_FILE_NAME: &str = "hugo.toml";

/// Host address the container port is published on.
pub const PUBLISH_HOST_IP: &str = "0.0.0.0";
