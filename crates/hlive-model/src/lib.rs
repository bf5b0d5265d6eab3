//! Domain types shared by every hlive crate.
//!
//! Nothing here performs I/O except [`HostOs::detect`], which reads the
//! process environment.

mod kind;
pub use kind::*;

mod domain;
pub use domain::*;
