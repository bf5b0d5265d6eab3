//! Filesystem change detection for the watch root.
//!
//! [`ChangeDetector`] registers a non-recursive watch on every directory under
//! the root and turns raw backend events into [`ChangeEvent`](hlive_model::ChangeEvent)s.
//! It does not debounce.

mod error;
pub use error::WatchError;

mod classify;
pub use classify::{changes, classify};

mod state;
pub use state::WatchState;

mod detector;
pub use detector::{ChangeDetector, ChangeStream};
