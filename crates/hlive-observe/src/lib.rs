//! Process-wide `tracing` setup for hlive binaries.
//!
//! Call [`logger_init`] once, early in `main`, before any component logs.
mod logger;
pub use logger::*;
