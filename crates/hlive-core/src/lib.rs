//! The live-preview loop: keep one container running and restart it, debounced,
//! whenever the watched tree changes.

mod error;
pub use error::CoreError;

mod slot;
pub use slot::HandleSlot;

mod debounce;
pub use debounce::{DEFAULT_DEBOUNCE, Debounce};

mod launcher;
pub use launcher::RestartOutcome;

mod coordinator;
pub use coordinator::RestartCoordinator;

mod termination;
pub use termination::{TerminationHandler, wait_for_shutdown_signal};

mod orchestrator;
pub use orchestrator::{INTERRUPTED_STATUS, Orchestrator, run_once};
