//! Container engine boundary and the single-container supervisor built on it.

mod error;
pub use error::{EngineError, EngineResult, LifecycleError};

pub mod engine;
pub use engine::{Attachment, Engine, InputSink, OutputStream};

mod util;

mod input;
pub use input::InputPump;

pub mod supervisor;
pub use supervisor::{ContainerSupervisor, Forwarders, StopReport, SupervisorConfig};

#[cfg(feature = "docker")]
pub mod docker;
#[cfg(feature = "docker")]
pub use docker::DockerEngine;

#[cfg(any(test, feature = "testing"))]
pub mod testing;
