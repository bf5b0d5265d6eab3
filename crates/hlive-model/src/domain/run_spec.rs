use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Host path exposed at a fixed path inside the container.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct BindMount {
    /// Host side, already spelled the way the engine expects it.
    pub source: PathBuf,
    /// Absolute path inside the container.
    pub target: String,
}

impl BindMount {
    pub fn new(source: impl Into<PathBuf>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

/// Published TCP port: `host_ip:host_port -> container_port/tcp`.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PortMapping {
    pub host_ip: String,
    pub host_port: u16,
    pub container_port: u16,
}

impl PortMapping {
    pub fn new(host_port: u16, container_port: u16) -> Self {
        Self {
            host_ip: crate::PUBLISH_HOST_IP.to_string(),
            host_port,
            container_port,
        }
    }

    /// Engine key for the exposed port, e.g. `"1313/tcp"`.
    pub fn container_key(&self) -> String {
        format!("{}/tcp", self.container_port)
    }
}

/// Immutable description of how to launch the workload.
///
/// Built once at startup and reused by every restart, so each cycle launches
/// an equivalent container.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RunSpec {
    /// Image reference, e.g. `"fortinet-hugo:latest"`.
    pub image: String,
    /// Arguments passed to the image entrypoint.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    /// Allocate a tty and forward stdin.
    #[serde(default)]
    pub interactive: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mounts: Vec<BindMount>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<PortMapping>,
}

impl RunSpec {
    pub fn new<I, S>(image: impl Into<String>, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            image: image.into(),
            command: command.into_iter().map(Into::into).collect(),
            interactive: false,
            mounts: Vec::new(),
            port: None,
        }
    }

    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    pub fn with_mount(mut self, mount: BindMount) -> Self {
        self.mounts.push(mount);
        self
    }

    pub fn with_port(mut self, port: PortMapping) -> Self {
        self.port = Some(port);
        self
    }
}
